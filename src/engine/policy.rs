//! Authorization rules that gate publishing and contact initiation.
//!
//! [`can_contact`] is a pure decision over the actor's profile and the
//! target owner; it never touches the store. [`AccessPolicy`] wraps it with
//! logging and metrics and turns a denial into an [`AppError`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::error::AppError;
use crate::models::user::UserProfile;
use crate::observability::metrics::Metrics;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Individual contacting a GP through a travel announcement.
    ContactTravel,
    /// GP contacting the owner of a request announcement.
    ContactRequest,
    PublishRequest,
    PublishTravel,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DenyReason {
    #[error("a user profile is required")]
    ProfileRequired,

    #[error("a GP account is required")]
    GpRequired,

    #[error("GP subscription is not active")]
    SubscriptionInactive,

    #[error("GP subscription has expired")]
    SubscriptionExpired,

    #[error("users cannot contact themselves")]
    SelfContact,

    #[error("only the owner may change this announcement")]
    NotOwner,
}

impl DenyReason {
    pub fn code(self) -> &'static str {
        match self {
            DenyReason::ProfileRequired => "profile_required",
            DenyReason::GpRequired => "gp_required",
            DenyReason::SubscriptionInactive => "subscription_inactive",
            DenyReason::SubscriptionExpired => "subscription_expired",
            DenyReason::SelfContact => "self_contact",
            DenyReason::NotOwner => "not_owner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AppError::Forbidden(reason)),
        }
    }
}

/// Decides whether `actor` may perform `kind` against an announcement owned
/// by `target_owner_id` (`None` for publishing).
pub fn can_contact(
    actor: Option<&UserProfile>,
    target_owner_id: Option<&str>,
    kind: InteractionKind,
    now: DateTime<Utc>,
) -> Decision {
    let Some(actor) = actor else {
        return Decision::Deny(DenyReason::ProfileRequired);
    };

    if target_owner_id == Some(actor.id.as_str()) {
        return Decision::Deny(DenyReason::SelfContact);
    }

    match kind {
        InteractionKind::ContactTravel | InteractionKind::PublishRequest => Decision::Allow,
        InteractionKind::ContactRequest | InteractionKind::PublishTravel => {
            active_gp(actor, now)
        }
    }
}

fn active_gp(actor: &UserProfile, now: DateTime<Utc>) -> Decision {
    if !actor.is_gp {
        return Decision::Deny(DenyReason::GpRequired);
    }

    match &actor.gp_subscription {
        Some(subscription) if subscription.is_active => {
            if subscription.is_valid_at(now) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::SubscriptionExpired)
            }
        }
        _ => Decision::Deny(DenyReason::SubscriptionInactive),
    }
}

#[derive(Clone)]
pub struct AccessPolicy {
    metrics: Metrics,
}

impl AccessPolicy {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    pub fn authorize(
        &self,
        actor: Option<&UserProfile>,
        target_owner_id: Option<&str>,
        kind: InteractionKind,
    ) -> Result<(), AppError> {
        let decision = can_contact(actor, target_owner_id, kind, Utc::now());

        let label = match decision {
            Decision::Allow => "allow",
            Decision::Deny(reason) => reason.code(),
        };
        self.metrics
            .contact_decisions_total
            .with_label_values(&[label])
            .inc();

        if let Decision::Deny(reason) = decision {
            info!(
                actor_id = actor.map(|a| a.id.as_str()).unwrap_or("<none>"),
                kind = ?kind,
                reason = reason.code(),
                "action denied by access policy"
            );
        }

        decision.into_result()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{can_contact, Decision, DenyReason, InteractionKind};
    use crate::models::user::{GpSubscription, UserProfile};

    fn profile(id: &str, is_gp: bool, subscription: Option<GpSubscription>) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            first_name: "Moussa".to_string(),
            last_name: "Ndiaye".to_string(),
            country: "Senegal".to_string(),
            contact: format!("{id}@example.com"),
            is_verified: false,
            is_gp,
            gp_subscription: subscription,
            created_at: Utc::now(),
        }
    }

    fn subscription(is_active: bool, days_left: i64) -> GpSubscription {
        let now = Utc::now();
        GpSubscription {
            is_active,
            start_date: now - Duration::days(30 - days_left),
            end_date: now + Duration::days(days_left),
            amount: 5000.0,
        }
    }

    #[test]
    fn missing_profile_is_denied_for_every_kind() {
        for kind in [
            InteractionKind::ContactTravel,
            InteractionKind::ContactRequest,
            InteractionKind::PublishRequest,
            InteractionKind::PublishTravel,
        ] {
            assert_eq!(
                can_contact(None, Some("user_gp"), kind, Utc::now()),
                Decision::Deny(DenyReason::ProfileRequired)
            );
        }
    }

    #[test]
    fn any_profile_may_contact_a_travel() {
        let individual = profile("user_1", false, None);
        let decision = can_contact(
            Some(&individual),
            Some("user_gp"),
            InteractionKind::ContactTravel,
            Utc::now(),
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn individual_cannot_contact_a_request() {
        let individual = profile("user_1", false, None);
        let decision = can_contact(
            Some(&individual),
            Some("user_3"),
            InteractionKind::ContactRequest,
            Utc::now(),
        );
        assert_eq!(decision, Decision::Deny(DenyReason::GpRequired));
    }

    #[test]
    fn gp_with_inactive_subscription_is_denied() {
        let gp = profile("user_2", true, Some(subscription(false, 10)));
        let decision = can_contact(
            Some(&gp),
            Some("user_3"),
            InteractionKind::ContactRequest,
            Utc::now(),
        );
        assert_eq!(decision, Decision::Deny(DenyReason::SubscriptionInactive));

        let without = profile("user_2", true, None);
        let decision = can_contact(
            Some(&without),
            Some("user_3"),
            InteractionKind::ContactRequest,
            Utc::now(),
        );
        assert_eq!(decision, Decision::Deny(DenyReason::SubscriptionInactive));
    }

    #[test]
    fn active_flag_past_end_date_counts_as_expired() {
        let gp = profile("user_2", true, Some(subscription(true, -1)));
        let decision = can_contact(
            Some(&gp),
            Some("user_3"),
            InteractionKind::ContactRequest,
            Utc::now(),
        );
        assert_eq!(decision, Decision::Deny(DenyReason::SubscriptionExpired));
    }

    #[test]
    fn active_gp_may_contact_request_and_publish_travel() {
        let gp = profile("user_2", true, Some(subscription(true, 29)));
        let now = Utc::now();

        assert!(can_contact(Some(&gp), Some("user_3"), InteractionKind::ContactRequest, now)
            .is_allowed());
        assert!(can_contact(Some(&gp), None, InteractionKind::PublishTravel, now).is_allowed());
    }

    #[test]
    fn self_contact_is_denied() {
        let gp = profile("user_2", true, Some(subscription(true, 29)));
        let decision = can_contact(
            Some(&gp),
            Some("user_2"),
            InteractionKind::ContactTravel,
            Utc::now(),
        );
        assert_eq!(decision, Decision::Deny(DenyReason::SelfContact));
    }

    #[test]
    fn publishing_a_request_only_needs_a_profile() {
        let individual = profile("user_1", false, None);
        assert!(
            can_contact(Some(&individual), None, InteractionKind::PublishRequest, Utc::now())
                .is_allowed()
        );
    }
}
