//! Messages exchanged during shard resolution and the ledger requests routed
//! through it.

use jetledger_types::{JetId, NodeId, PulseNumber, RecordId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Peer protocol
// ============================================================================

/// Request sent to another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Describe the jet covering `object` at `pulse`.
    ///
    /// `jet` is the jet the sender currently believes covers the object.
    GetJet {
        /// Object being routed.
        object: RecordId,
        /// Jet the sender is asking about.
        jet: JetId,
        /// Pulse whose tree should answer.
        pulse: PulseNumber,
    },
}

/// Reply received from another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// The responder's view of the jet covering the requested object.
    Jet {
        /// Jet covering the object in the responder's tree.
        id: JetId,
        /// Whether the responder considers that jet actual.
        actual: bool,
    },
    /// The jet belongs to another executor.
    JetMiss {
        /// The jet that was resolved.
        jet: JetId,
        /// Node that executes it.
        executor: NodeId,
    },
    /// The responder failed to handle the request.
    Error {
        /// Failure description.
        message: String,
    },
}

/// Delivery options for [`crate::MessageBus::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    /// Node the message is addressed to.
    pub receiver: NodeId,
}

// ============================================================================
// Ledger requests
// ============================================================================

/// What a request is routed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Route by the jet covering this object.
    Object(RecordId),
    /// The request names its jet directly; no tree lookup.
    Jet(JetId),
}

/// Which pulse's tree routes a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPulse {
    /// The pulse the request was sent in.
    Current,
    /// A fixed pulse named by the request.
    Specific(PulseNumber),
}

/// Incoming ledger request kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerRequest {
    /// Store a record under an object.
    SetRecord {
        /// Object the record belongs to.
        object: RecordId,
        /// Record body.
        body: Vec<u8>,
    },
    /// Read an object's state.
    GetObject {
        /// Object to read.
        object: RecordId,
        /// Specific state to read; latest when absent.
        state: Option<RecordId>,
    },
    /// Append a new state to an object.
    UpdateObject {
        /// Object to update.
        object: RecordId,
        /// New state body.
        body: Vec<u8>,
    },
    /// Store a blob owned by an object.
    SetBlob {
        /// Owning object.
        object: RecordId,
        /// Blob content.
        blob: Vec<u8>,
    },
    /// Describe a jet. Handled by the node that owns the named jet.
    GetJet {
        /// Object being routed.
        object: RecordId,
        /// Jet being described.
        jet: JetId,
        /// Pulse whose tree answers.
        pulse: PulseNumber,
    },
    /// Deliver a sealed jet drop.
    JetDrop {
        /// Jet the drop seals.
        jet: JetId,
        /// Pulse the drop seals.
        pulse: PulseNumber,
        /// Encoded drop.
        drop: Vec<u8>,
    },
}

impl LedgerRequest {
    /// What the request is routed by.
    pub fn target(&self) -> Target {
        match self {
            Self::SetRecord { object, .. }
            | Self::GetObject { object, .. }
            | Self::UpdateObject { object, .. }
            | Self::SetBlob { object, .. } => Target::Object(*object),
            Self::GetJet { jet, .. } | Self::JetDrop { jet, .. } => Target::Jet(*jet),
        }
    }

    /// Which pulse's tree routes the request.
    pub fn target_pulse(&self) -> TargetPulse {
        match self {
            Self::SetRecord { .. }
            | Self::GetObject { .. }
            | Self::UpdateObject { .. }
            | Self::SetBlob { .. } => TargetPulse::Current,
            Self::GetJet { pulse, .. } | Self::JetDrop { pulse, .. } => {
                TargetPulse::Specific(*pulse)
            },
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetRecord { .. } => "set_record",
            Self::GetObject { .. } => "get_object",
            Self::UpdateObject { .. } => "update_object",
            Self::SetBlob { .. } => "set_blob",
            Self::GetJet { .. } => "get_jet",
            Self::JetDrop { .. } => "jet_drop",
        }
    }
}

/// A ledger request together with the pulse it was sent in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// The request.
    pub request: LedgerRequest,
    /// Pulse the request was sent in.
    pub pulse: PulseNumber,
}

impl Parcel {
    /// Pulse whose tree routes this parcel.
    pub fn target_pulse(&self) -> PulseNumber {
        match self.request.target_pulse() {
            TargetPulse::Current => self.pulse,
            TargetPulse::Specific(pulse) => pulse,
        }
    }
}
