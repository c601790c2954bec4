use chrono::{DateTime, Duration, Utc};

use crate::config::Config;
use crate::engine::locks::KeyedLocks;
use crate::engine::matcher::ConversationMatcher;
use crate::engine::messaging::MessagingService;
use crate::engine::policy::AccessPolicy;
use crate::engine::shipment::{allow_any, forward_only, ShipmentTracker, TransitionValidator};
use crate::models::user::GpSubscription;
use crate::observability::metrics::Metrics;
use crate::store::Stores;

/// Terms applied when a user activates a (simulated) GP subscription.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionTerms {
    pub days: i64,
    pub amount: f64,
}

impl SubscriptionTerms {
    pub fn starting_at(&self, now: DateTime<Utc>) -> GpSubscription {
        GpSubscription {
            is_active: true,
            start_date: now,
            end_date: now + Duration::days(self.days),
            amount: self.amount,
        }
    }
}

pub struct AppState {
    pub stores: Stores,
    pub policy: AccessPolicy,
    pub matcher: ConversationMatcher,
    pub messaging: MessagingService,
    pub shipments: ShipmentTracker,
    pub subscription: SubscriptionTerms,
    /// Serializes profile writes per normalized contact.
    pub profile_locks: KeyedLocks,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_stores(config, Stores::in_memory())
    }

    pub fn with_stores(config: &Config, stores: Stores) -> Self {
        let metrics = Metrics::new();
        let validator: TransitionValidator = if config.strict_shipment_transitions {
            forward_only
        } else {
            allow_any
        };

        Self {
            policy: AccessPolicy::new(metrics.clone()),
            matcher: ConversationMatcher::new(stores.clone(), metrics.clone()),
            messaging: MessagingService::new(stores.clone(), metrics.clone()),
            shipments: ShipmentTracker::new(stores.clone(), validator, metrics.clone()),
            subscription: SubscriptionTerms {
                days: config.gp_subscription_days,
                amount: config.gp_subscription_amount,
            },
            profile_locks: KeyedLocks::new(),
            stores,
            metrics,
        }
    }
}
