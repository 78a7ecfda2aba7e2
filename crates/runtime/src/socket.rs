//! Socket-carried action protocol.
//!
//! A [`LiveSocket`] scopes one connection to one root element, so several
//! sockets on a page never cross-wire each other's clicks and submits. The
//! runtime owns the protocol state; the host owns the actual connection and
//! feeds lifecycle callbacks in, taking outbound frames back.

use dom::{Document, NodeId};
use wire::{ClientFrame, CloseOutcome, Connection, ReconnectPolicy, ServerFrame};

use crate::invoke::collect_submission_data;
use crate::locator;
use crate::schedule::TimerTask;
use crate::trigger::unregister_subtree;
use crate::{DueAction, Runtime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketId(pub u64);

pub(crate) struct LiveSocket {
    pub id: SocketId,
    pub root: NodeId,
    pub component_id: Option<String>,
    pub conn: Connection,
}

impl Runtime {
    /// Registers a socket scoped to `root`. The instance id on the root (if
    /// any) rides along in the `init` frame once the connection opens.
    pub fn attach_socket(
        &mut self,
        doc: &Document,
        root: NodeId,
        policy: ReconnectPolicy,
    ) -> SocketId {
        let id = SocketId(self.next_socket_id);
        self.next_socket_id += 1;
        let component_id = doc
            .attr(root, &self.attrs.instance)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        self.sockets.push(LiveSocket {
            id,
            root,
            component_id,
            conn: Connection::new(policy),
        });
        id
    }

    pub fn detach_socket(&mut self, id: SocketId) {
        self.sockets.retain(|s| s.id != id);
    }

    fn socket_mut(&mut self, id: SocketId) -> Option<&mut LiveSocket> {
        self.sockets.iter_mut().find(|s| s.id == id)
    }

    /// The connection reached open: counter resets, and the component
    /// announces itself when known.
    pub fn socket_opened(&mut self, id: SocketId) -> Option<ClientFrame> {
        let socket = self.socket_mut(id)?;
        socket.conn.on_open();
        socket
            .component_id
            .clone()
            .map(|component_id| ClientFrame::Init { component_id })
    }

    /// The connection dropped. Schedules a backoff reconnect until the
    /// attempt budget is spent; after that the socket stays closed for good.
    pub fn socket_closed(&mut self, id: SocketId) {
        let Some(socket) = self.socket_mut(id) else {
            return;
        };
        match socket.conn.on_closed() {
            CloseOutcome::Reconnect { delay_ms } => {
                log::info!(
                    target: "runtime.socket",
                    "socket {} reconnecting in {delay_ms}ms (attempt {})",
                    id.0,
                    socket.conn.attempts(),
                );
                self.timers
                    .schedule(delay_ms, TimerTask::SocketReconnect { socket: id });
            }
            CloseOutcome::GiveUp => {
                log::warn!(
                    target: "runtime.socket",
                    "socket {} exhausted its reconnect budget; staying closed",
                    id.0,
                );
            }
        }
    }

    pub(crate) fn socket_reconnect_due(&mut self, id: SocketId, out: &mut Vec<DueAction>) {
        if let Some(socket) = self.socket_mut(id) {
            socket.conn.reconnecting();
            out.push(DueAction::ReconnectSocket(id));
        }
    }

    /// Handles one inbound frame.
    pub fn socket_frame(&mut self, doc: &mut Document, id: SocketId, frame: ServerFrame) {
        match frame {
            ServerFrame::Update { component_id, data } => {
                let Some(node) = locator::find_by_instance(doc, &self.attrs, &component_id) else {
                    log::warn!(
                        target: "runtime.socket",
                        "update for unknown component '{component_id}'",
                    );
                    return;
                };
                let resp = Document::parse_fragment(&data.html);
                let Some(src) = resp.first_element_child(resp.root()) else {
                    log::warn!(target: "runtime.socket", "empty update for '{component_id}'");
                    return;
                };
                unregister_subtree(&mut self.triggers, &mut self.timers, doc, node);
                let new_root = doc.adopt(&resp, src);
                if !doc.replace_node(node, new_root) {
                    return;
                }
                self.hooks.execute_scripts(doc, new_root);
                // while open, the delegation scope follows the replaced node
                if let Some(socket) = self.socket_mut(id)
                    && socket.root == node
                    && socket.conn.is_open()
                {
                    socket.root = new_root;
                }
                self.hooks.wire_refresh(doc);
            }
            ServerFrame::Redirect { url } => self.hooks.navigate(&url),
            ServerFrame::Error { message, code } => {
                log::warn!(target: "runtime.socket", "server error {code}: {message}");
            }
        }
    }

    /// Scoped click/submit delegation over the socket. Returns the action
    /// frame to send, or `None` when the event is not this socket's to
    /// handle (closed connection, out of scope, nothing actionable).
    pub fn socket_event(
        &self,
        doc: &Document,
        id: SocketId,
        target: NodeId,
        event_type: &str,
    ) -> Option<ClientFrame> {
        let socket = self.sockets.iter().find(|s| s.id == id)?;
        if !socket.conn.is_open() {
            return None;
        }
        let scope = socket.root;
        if target != scope && !doc.ancestors(target).any(|a| a == scope) {
            return None;
        }

        match event_type {
            "submit" => {
                let form_selector = dom::SelectorList::parse("form").expect("form selector");
                let form = doc.closest(target, &form_selector)?;
                let component_id = doc
                    .attr(form, &self.attrs.instance)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .or_else(|| socket.component_id.clone())?;
                let action = doc
                    .attr(form, &self.attrs.action)
                    .filter(|a| !a.is_empty())
                    .unwrap_or("submit")
                    .to_string();
                let data = collect_submission_data(doc, &self.attrs, form, Some(scope));
                Some(ClientFrame::Action {
                    component_id,
                    action,
                    data,
                })
            }
            "click" => {
                let el = doc.closest(target, &self.attrs.action_selector())?;
                if doc.tag_name(el) == Some("form") {
                    return None;
                }
                let component_id = doc
                    .attr(el, &self.attrs.instance)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .or_else(|| socket.component_id.clone())?;
                let action = doc
                    .attr(el, &self.attrs.action)
                    .filter(|a| !a.is_empty())?
                    .to_string();
                let data = collect_submission_data(doc, &self.attrs, el, Some(scope));
                Some(ClientFrame::Action {
                    component_id,
                    action,
                    data,
                })
            }
            _ => None,
        }
    }
}
