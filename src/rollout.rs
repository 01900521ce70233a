use crate::{
    error::PublishError,
    model::{Release, ReleaseStatus},
};

/// Fraction sent with a halted release. The API rejects halted releases
/// whose fraction is zero or missing, so this is a compatibility value and
/// not a rollout the user asked for.
pub const HALTED_USER_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutPlan {
    pub status: ReleaseStatus,
    pub user_fraction: Option<f64>,
}

impl RolloutPlan {
    pub fn apply(&self, release: &mut Release) {
        release.status = self.status;
        release.user_fraction = self.user_fraction;
    }
}

pub fn plan_for_fraction(fraction: f64) -> RolloutPlan {
    if fraction >= 1.0 {
        RolloutPlan {
            status: ReleaseStatus::Completed,
            user_fraction: None,
        }
    } else {
        RolloutPlan {
            status: ReleaseStatus::InProgress,
            user_fraction: Some(fraction),
        }
    }
}

/// A fraction of zero or less halts the rollout.
pub fn plan_for_rollout_update(fraction: f64) -> RolloutPlan {
    if fraction <= 0.0 {
        RolloutPlan {
            status: ReleaseStatus::Halted,
            user_fraction: Some(HALTED_USER_FRACTION),
        }
    } else {
        plan_for_fraction(fraction)
    }
}

pub fn plan_for_draft() -> RolloutPlan {
    RolloutPlan {
        status: ReleaseStatus::Draft,
        user_fraction: None,
    }
}

/// Status comes straight from the caller. With `keep_current` the
/// release's existing fraction wins over `fraction`.
pub fn plan_for_status(
    status: ReleaseStatus,
    fraction: Option<f64>,
    keep_current: bool,
    current: &Release,
) -> RolloutPlan {
    let user_fraction = if keep_current {
        current.user_fraction
    } else {
        fraction
    };
    RolloutPlan {
        status,
        user_fraction,
    }
}

pub fn validate_fraction(fraction: f64) -> Result<f64, PublishError> {
    if fraction > 0.0 && fraction <= 1.0 {
        Ok(fraction)
    } else {
        Err(PublishError::InvalidInput(format!(
            "user fraction must be in (0, 1], got {}",
            fraction
        )))
    }
}
