use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub conversations_total: IntCounterVec,
    pub messages_sent_total: IntCounter,
    pub contact_decisions_total: IntCounterVec,
    pub shipment_status_updates_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let conversations_total = IntCounterVec::new(
            Opts::new(
                "conversations_total",
                "Conversation lookups by outcome (created or existing)",
            ),
            &["outcome"],
        )
        .expect("valid conversations_total metric");

        let messages_sent_total =
            IntCounter::new("messages_sent_total", "Total messages appended")
                .expect("valid messages_sent_total metric");

        let contact_decisions_total = IntCounterVec::new(
            Opts::new(
                "contact_decisions_total",
                "Access policy decisions by outcome",
            ),
            &["decision"],
        )
        .expect("valid contact_decisions_total metric");

        let shipment_status_updates_total = IntCounterVec::new(
            Opts::new(
                "shipment_status_updates_total",
                "Accepted shipment status updates by new status",
            ),
            &["status"],
        )
        .expect("valid shipment_status_updates_total metric");

        registry
            .register(Box::new(conversations_total.clone()))
            .expect("register conversations_total");
        registry
            .register(Box::new(messages_sent_total.clone()))
            .expect("register messages_sent_total");
        registry
            .register(Box::new(contact_decisions_total.clone()))
            .expect("register contact_decisions_total");
        registry
            .register(Box::new(shipment_status_updates_total.clone()))
            .expect("register shipment_status_updates_total");

        Self {
            registry,
            conversations_total,
            messages_sent_total,
            contact_decisions_total,
            shipment_status_updates_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
