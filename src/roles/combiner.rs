use tracing::debug;

use crate::models::{Role, RolePrediction, Transcript};

/// Apply predicted roles onto a transcript, producing a new role-tagged
/// transcript.
///
/// Turns that already carry a role (vendor hints, or a previous
/// combination) are left untouched, which makes this idempotent.
/// Channels absent from the prediction resolve to UNKNOWN: partial
/// coverage is a reportable outcome, not an error. The channel set is
/// never altered.
pub fn combine(transcript: &Transcript, prediction: &RolePrediction) -> Transcript {
    let mut combined = transcript.clone();
    let mut defaulted = 0usize;

    for turn in &mut combined.turns {
        if turn.role.is_some() {
            continue;
        }
        turn.role = Some(match prediction.role_for(&turn.channel_tag) {
            Some(role) => role,
            None => {
                defaulted += 1;
                Role::Unknown
            }
        });
    }

    if defaulted > 0 {
        debug!(
            turns = defaulted,
            "turns on channels without a prediction resolved to UNKNOWN"
        );
    }

    combined
}
