//! Status transition rules for incidents.
//!
//! The service consults a [`TransitionPolicy`] before every status change.
//! The default policy permits every move, including self-transitions and
//! reopening a resolved incident.

use std::sync::Arc;

use crate::features::incidents::models::IncidentStatus;

/// Decides whether an incident may move from one status to another
pub trait TransitionPolicy: Send + Sync {
    /// Returns a description of the refusal when the move is not allowed
    fn check(&self, from: IncidentStatus, to: IncidentStatus) -> Result<(), String>;
}

/// Total transition graph: any status may follow any other
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveTransitions;

impl TransitionPolicy for PermissiveTransitions {
    fn check(&self, _from: IncidentStatus, _to: IncidentStatus) -> Result<(), String> {
        Ok(())
    }
}

/// Forward-only policy: `open -> in_progress -> resolved`, no reopening
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardOnlyTransitions;

impl ForwardOnlyTransitions {
    fn rank(status: IncidentStatus) -> u8 {
        match status {
            IncidentStatus::Open => 0,
            IncidentStatus::InProgress => 1,
            IncidentStatus::Resolved => 2,
        }
    }
}

impl TransitionPolicy for ForwardOnlyTransitions {
    fn check(&self, from: IncidentStatus, to: IncidentStatus) -> Result<(), String> {
        if Self::rank(to) >= Self::rank(from) {
            Ok(())
        } else {
            Err(format!(
                "Status cannot move from '{}' back to '{}'",
                from, to
            ))
        }
    }
}

/// Resolve a policy from its configured name (`permissive` or `forward_only`)
pub fn policy_by_name(name: &str) -> Result<Arc<dyn TransitionPolicy>, String> {
    match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "permissive" => Ok(Arc::new(PermissiveTransitions)),
        "forward_only" => Ok(Arc::new(ForwardOnlyTransitions)),
        other => Err(format!(
            "Unknown status transition policy '{}', expected 'permissive' or 'forward_only'",
            other
        )),
    }
}
