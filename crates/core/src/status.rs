//! Status, kind, and intent enums mapping to SMALLSERIAL/SMALLINT lookup
//! tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding lookup table created by the `croft-db` migrations.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database lookup ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database lookup ID back to the enum variant.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Lifecycle status of a single cluster-backed resource.
    ResourceStatus {
        /// Desired-state row exists, nothing provisioned yet.
        Creating = 1,
        /// Backend operation issued, waiting for the backend to report ready.
        Starting = 2,
        Running = 3,
        Stopping = 4,
        Stopped = 5,
        Terminating = 6,
        /// Absorbing soft-delete marker. No transition leaves it.
        Terminated = 7,
        /// Recoverable failure; re-claimed after the retry backoff lapses.
        Error = 8,
    }
}

define_status_enum! {
    /// Derived project status. Written only by the status aggregator.
    ProjectStatus {
        Creating = 1,
        Starting = 2,
        Running = 3,
        Stopping = 4,
        Stopped = 5,
        Terminating = 6,
        Terminated = 7,
        Error = 8,
        /// Children are in an inconsistent mix; requires operator attention.
        Partial = 9,
    }
}

define_status_enum! {
    /// The two kinds of cluster-backed resources a project owns.
    ResourceKind {
        Sandbox = 1,
        Database = 2,
    }
}

define_status_enum! {
    /// The action a transition listener is asked to perform.
    Intent {
        Create = 1,
        Start = 2,
        Stop = 3,
        Delete = 4,
        StatusCheck = 5,
    }
}

impl ResourceStatus {
    /// Human-readable lowercase name, matching the lookup table seed data.
    pub fn name(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Terminating => "terminating",
            Self::Terminated => "terminated",
            Self::Error => "error",
        }
    }
}

impl ResourceKind {
    /// Human-readable lowercase name, matching the lookup table seed data.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Database => "database",
        }
    }

    /// Both kinds, in seed order. Each gets its own scheduler tick loop.
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Sandbox, ResourceKind::Database];
}

impl Intent {
    /// Human-readable lowercase name, matching the lookup table seed data.
    pub fn name(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Delete => "delete",
            Self::StatusCheck => "status_check",
        }
    }
}
