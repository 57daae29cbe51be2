//! Answers `GetJet` requests from peers.

use std::sync::Arc;

use jetledger_jet::JetStore;
use tracing::debug;

use crate::message::{Reply, Request};

/// Serves this node's view of its jet trees.
#[derive(Debug, Clone)]
pub struct JetDescriber {
    jets: Arc<JetStore>,
}

impl JetDescriber {
    /// Creates a describer over `jets`.
    pub fn new(jets: Arc<JetStore>) -> Self {
        Self { jets }
    }

    /// Replies with the jet covering the requested object at the requested
    /// pulse and whether this node considers it actual.
    pub fn handle(&self, request: &Request) -> Reply {
        match request {
            Request::GetJet { object, jet, pulse } => {
                let (id, actual) = self.jets.for_id(*pulse, &object.hash);
                debug!(asked = %jet, id = %id, actual, pulse = %pulse, "Describing jet");
                Reply::Jet { id, actual }
            },
        }
    }
}
