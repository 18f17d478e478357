use enhancer_core::{BridgeAction, BridgeMessage, ControlMessage, DuplexFrame};
use tokio::sync::{mpsc, oneshot};

use super::{ContextId, Port, port_pair};
use crate::handler::RequestHandler;
use crate::session::{ContextTable, MenuDelivery, MenuState, MenuTarget};
use crate::{BridgeError, Result};

#[derive(Debug)]
struct Connection {
    serial: u64,
    tx: mpsc::UnboundedSender<DuplexFrame>,
}

#[derive(Debug)]
enum Event {
    Connect { ctx: ContextId, serial: u64, tx: mpsc::UnboundedSender<DuplexFrame> },
    Frame { ctx: ContextId, serial: u64, frame: DuplexFrame },
    Closed { ctx: ContextId, serial: u64 },
    OpenMenu { ctx: ContextId, reply: oneshot::Sender<Result<MenuTarget>> },
    State { ctx: ContextId, reply: oneshot::Sender<MenuState> },
}

/// Host-side actor serving every connected content context.
///
/// All connection bookkeeping lives inside the actor task. Frames are
/// handled one at a time in arrival order, after a startup sync of the user
/// script.
#[derive(Debug)]
pub struct Coordinator {
    handler: RequestHandler,
    table: ContextTable<Connection>,
    events: mpsc::UnboundedReceiver<Event>,
}

/// Cloneable handle to a running [`Coordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    events: mpsc::UnboundedSender<Event>,
    serials: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl Coordinator {
    /// Spawn the actor. It stops once every handle and connection is gone.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn(handler: RequestHandler) -> CoordinatorHandle {
        let (tx, events) = mpsc::unbounded_channel();
        let actor = Self { handler, table: ContextTable::new(), events };
        tokio::spawn(actor.run());
        CoordinatorHandle { events: tx, serials: std::sync::Arc::default() }
    }

    async fn run(mut self) {
        self.handler.sync_on_start().await;
        while let Some(event) = self.events.recv().await {
            match event {
                Event::Connect { ctx, serial, tx } => {
                    tracing::debug!(ctx, "context connected");
                    self.table.connect(ctx, Connection { serial, tx });
                },
                Event::Frame { ctx, serial, frame } => {
                    if self.is_current(ctx, serial) {
                        self.handle_frame(ctx, frame).await;
                    }
                },
                Event::Closed { ctx, serial } => {
                    if self.is_current(ctx, serial) {
                        tracing::debug!(ctx, "context disconnected");
                        self.table.disconnect(ctx);
                    }
                },
                Event::OpenMenu { ctx, reply } => {
                    let target = self.open_menu(ctx).await;
                    if let Err(e) = &target {
                        tracing::warn!(ctx, error = %e, "could not open the menu");
                    }
                    let _ = reply.send(target);
                },
                Event::State { ctx, reply } => {
                    let _ = reply.send(self.table.state(ctx));
                },
            }
        }
        tracing::debug!("coordinator stopped");
    }

    async fn open_menu(&mut self, ctx: ContextId) -> Result<MenuTarget> {
        let target = self.handler.menu_context(ctx).await?;
        let delivery = self.table.request_open_menu(target);
        if delivery == MenuDelivery::Immediate {
            self.send_open_menu(target);
        }
        Ok(MenuTarget { ctx: target, delivery })
    }

    fn is_current(&self, ctx: ContextId, serial: u64) -> bool {
        self.table.port(ctx).is_some_and(|conn| conn.serial == serial)
    }

    async fn handle_frame(&mut self, ctx: ContextId, frame: DuplexFrame) {
        if !frame.on_bridge_channel() {
            tracing::debug!(ctx, channel = ?frame.channel, "dropping frame from another channel");
            return;
        }
        let Some(message) = BridgeMessage::parse(&frame.message) else {
            return;
        };

        match message {
            BridgeMessage::Action(BridgeAction::QueryDatabase(request)) => {
                let result = self.handler.execute(&request).await;
                if let Err(e) = &result {
                    tracing::warn!(
                        ctx,
                        error = %e,
                        transient = e.is_transient(),
                        query = %request.query(),
                        "store request failed"
                    );
                }
                if let Some(invocation) = frame.invocation {
                    let reply = match &result {
                        Ok(value) => DuplexFrame::reply(invocation, value.clone()),
                        Err(e) => DuplexFrame::failure(invocation, e.to_string()),
                    };
                    self.send(ctx, reply);
                }
                if result.is_ok() {
                    self.handler.after_reply(&request).await;
                }
            },
            BridgeMessage::Control(ControlMessage::LoadComplete) => {
                if self.table.load_complete(ctx) {
                    self.send_open_menu(ctx);
                }
            },
            BridgeMessage::Control(control @ ControlMessage::ReloadApp) => {
                if let Err(e) = self.handler.control(control).await {
                    tracing::warn!(ctx, error = %e, "reload failed");
                }
            },
            BridgeMessage::Control(ControlMessage::OpenMenu) => {
                tracing::debug!(ctx, "ignoring open-menu sent by a content context");
            },
        }
    }

    fn send_open_menu(&self, ctx: ContextId) {
        self.send(ctx, DuplexFrame::notification(&BridgeMessage::from(ControlMessage::OpenMenu)));
    }

    fn send(&self, ctx: ContextId, frame: DuplexFrame) {
        let delivered = self.table.port(ctx).is_some_and(|conn| conn.tx.send(frame).is_ok());
        if !delivered {
            tracing::debug!(ctx, "context went away before its frame was sent");
        }
    }
}

impl CoordinatorHandle {
    /// Open a connection for `ctx` and return the context's end of it.
    /// Connecting again replaces the previous connection.
    ///
    /// # Errors
    /// Returns `ChannelClosed` if the coordinator has stopped.
    pub fn connect(&self, ctx: ContextId) -> Result<Port> {
        let (near, far) = port_pair();
        let (tx, mut rx) = far.split();
        let serial = self.serials.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.events
            .send(Event::Connect { ctx, serial, tx })
            .map_err(|_| BridgeError::ChannelClosed)?;

        let events = self.events.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if events.send(Event::Frame { ctx, serial, frame }).is_err() {
                    return;
                }
            }
            let _ = events.send(Event::Closed { ctx, serial });
        });
        Ok(near)
    }

    /// Open the menu on behalf of `ctx`. The host picks the app context to
    /// show it in; that context gets `open-menu` now if it is ready, or
    /// once it reports `load-complete`.
    ///
    /// # Errors
    /// Returns `ChannelClosed` if the coordinator has stopped, or
    /// `AppControl` if the host could not provide an app context.
    pub async fn open_menu(&self, ctx: ContextId) -> Result<MenuTarget> {
        let (reply, rx) = oneshot::channel();
        self.events.send(Event::OpenMenu { ctx, reply }).map_err(|_| BridgeError::ChannelClosed)?;
        rx.await.map_err(|_| BridgeError::ChannelClosed)?
    }

    /// # Errors
    /// Returns `ChannelClosed` if the coordinator has stopped.
    pub async fn menu_state(&self, ctx: ContextId) -> Result<MenuState> {
        let (reply, rx) = oneshot::channel();
        self.events.send(Event::State { ctx, reply }).map_err(|_| BridgeError::ChannelClosed)?;
        rx.await.map_err(|_| BridgeError::ChannelClosed)
    }
}
