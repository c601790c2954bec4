use tracing::info;

use crate::engine::matcher::OpenConversation;
use crate::engine::policy::InteractionKind;
use crate::error::AppError;
use crate::models::conversation::Conversation;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactTarget {
    Travel(String),
    Request(String),
}

impl ContactTarget {
    pub fn kind(&self) -> InteractionKind {
        match self {
            ContactTarget::Travel(_) => InteractionKind::ContactTravel,
            ContactTarget::Request(_) => InteractionKind::ContactRequest,
        }
    }
}

struct ResolvedTarget {
    owner_id: String,
    owner_name: String,
    owner_is_gp: bool,
    request_id: Option<String>,
    travel_id: Option<String>,
}

/// Opens (or reopens) the conversation between `actor_id` and the owner of an
/// announcement. The access policy runs before the matcher, so a denied
/// attempt never creates anything.
pub fn initiate_contact(
    state: &AppState,
    actor_id: &str,
    target: ContactTarget,
) -> Result<(Conversation, bool), AppError> {
    let actor = state.stores.users.find_by_id(actor_id);
    if actor.is_none() {
        // Profile remediation wins over a stale or unknown announcement.
        state.policy.authorize(None, None, target.kind())?;
    }

    let resolved = resolve(state, &target)?;

    state
        .policy
        .authorize(actor.as_ref(), Some(&resolved.owner_id), target.kind())?;

    let (conversation, created) = state.matcher.find_or_create(OpenConversation {
        user_id: actor_id.to_string(),
        other_user_id: resolved.owner_id,
        other_user_name: resolved.owner_name,
        other_user_is_gp: resolved.owner_is_gp,
        request_id: resolved.request_id,
        travel_id: resolved.travel_id,
    })?;

    info!(
        actor_id,
        target = ?target,
        conversation_id = %conversation.id,
        created,
        "contact initiated"
    );

    Ok((conversation, created))
}

/// Raw conversation opening between two named users. The initiator must have
/// a profile, and the gate runs as a request contact when `request_id` is
/// set and as a travel contact otherwise.
pub fn open_conversation(
    state: &AppState,
    input: OpenConversation,
) -> Result<(Conversation, bool), AppError> {
    let actor = state
        .stores
        .users
        .find_by_id(&input.user_id)
        .ok_or_else(|| AppError::UserNotFound(input.user_id.clone()))?;

    let kind = if input.request_id.is_some() {
        InteractionKind::ContactRequest
    } else {
        InteractionKind::ContactTravel
    };
    state
        .policy
        .authorize(Some(&actor), Some(&input.other_user_id), kind)?;

    state.matcher.find_or_create(input)
}

fn resolve(state: &AppState, target: &ContactTarget) -> Result<ResolvedTarget, AppError> {
    match target {
        ContactTarget::Travel(travel_id) => {
            let travel = state
                .stores
                .travels
                .find_by_id(travel_id)
                .ok_or_else(|| AppError::NotFound(format!("travel {travel_id} not found")))?;
            let owner = state
                .stores
                .users
                .find_by_id(&travel.gp_id)
                .ok_or_else(|| AppError::UserNotFound(travel.gp_id.clone()))?;

            Ok(ResolvedTarget {
                owner_id: owner.id.clone(),
                owner_name: owner.full_name(),
                owner_is_gp: owner.is_gp,
                request_id: None,
                travel_id: Some(travel.id),
            })
        }
        ContactTarget::Request(request_id) => {
            let request = state
                .stores
                .requests
                .find_by_id(request_id)
                .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;
            let owner = state.stores.users.find_by_id(&request.user_id);

            Ok(ResolvedTarget {
                owner_name: owner
                    .as_ref()
                    .map(|user| user.full_name())
                    .unwrap_or_else(|| request.user_name.clone()),
                owner_is_gp: owner.as_ref().is_some_and(|user| user.is_gp),
                owner_id: request.user_id,
                request_id: Some(request.id),
                travel_id: None,
            })
        }
    }
}
