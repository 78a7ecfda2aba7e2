//! Shared fakes: a scripted transport, recording hooks, and a runtime wired
//! to a manual clock.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use dom::{Document, NodeId};
use runtime::{HostHooks, ManualClock, Runtime};
use wire::{ActionPayload, ActionResponse, Transport, TransportError};

pub struct ScriptedTransport {
    calls: Rc<RefCell<Vec<ActionPayload>>>,
    responses: Rc<RefCell<VecDeque<Result<ActionResponse, TransportError>>>>,
}

impl Transport for ScriptedTransport {
    fn post(&mut self, payload: &ActionPayload) -> Result<ActionResponse, TransportError> {
        self.calls.borrow_mut().push(payload.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(ActionResponse::default()))
    }
}

#[derive(Clone)]
pub struct TransportProbe {
    calls: Rc<RefCell<Vec<ActionPayload>>>,
    responses: Rc<RefCell<VecDeque<Result<ActionResponse, TransportError>>>>,
}

impl TransportProbe {
    pub fn respond(&self, response: ActionResponse) {
        self.responses.borrow_mut().push_back(Ok(response));
    }

    pub fn respond_html(&self, html: &str) {
        self.respond(ActionResponse {
            html: html.to_string(),
            ..ActionResponse::default()
        });
    }

    pub fn fail(&self, error: TransportError) {
        self.responses.borrow_mut().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<ActionPayload> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

pub fn scripted_transport() -> (Box<ScriptedTransport>, TransportProbe) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let responses = Rc::new(RefCell::new(VecDeque::new()));
    (
        Box::new(ScriptedTransport {
            calls: calls.clone(),
            responses: responses.clone(),
        }),
        TransportProbe { calls, responses },
    )
}

#[derive(Clone, Default)]
pub struct RecordingHooks {
    pub navigations: Rc<RefCell<Vec<String>>>,
    pub scripted_inserts: Rc<RefCell<usize>>,
    pub wire_refreshes: Rc<RefCell<usize>>,
}

impl HostHooks for RecordingHooks {
    fn execute_scripts(&mut self, _doc: &Document, _inserted: NodeId) {
        *self.scripted_inserts.borrow_mut() += 1;
    }

    fn wire_refresh(&mut self, _doc: &Document) {
        *self.wire_refreshes.borrow_mut() += 1;
    }

    fn navigate(&mut self, url: &str) {
        self.navigations.borrow_mut().push(url.to_string());
    }
}

pub fn runtime_with_clock() -> (Runtime, TransportProbe, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new());
    let (transport, probe) = scripted_transport();
    let rt = Runtime::with_clock(transport, clock.clone());
    (rt, probe, clock)
}

pub fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.find_by_dom_id(id)
        .unwrap_or_else(|| panic!("no element with id '{id}'"))
}
