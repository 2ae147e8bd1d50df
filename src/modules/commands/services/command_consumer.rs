use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use super::authorizer::InboundCommandAuthorizer;
use super::resource_store::ResourceStore;
use crate::modules::commands::models::{
    Action, CommandOutcome, ReadRequest, ReadResponse, ResourceType, UpdateCommand,
};
use crate::modules::events::models::topics::{
    CREDIT_SCORE_REQUEST, CREDIT_SCORE_RESPONSE, CUSTOMER_DATA_REQUEST, CUSTOMER_UPDATED,
    CUSTOMER_UPDATE_REQUEST, COMPANY_PROFILE_UPDATED,
};
use crate::modules::events::models::{
    resolve_topic, DomainEvent, ScoreRequestPayload, ScoreResponsePayload,
};
use crate::modules::events::services::EventDistributor;
use crate::modules::scoring::repositories::CreditScoreStore;

/// Applies authorized inbound commands and answers read requests
///
/// Handlers never return errors to the caller; failures become outcomes,
/// structured responses and log lines.
pub struct CommandConsumer {
    authorizer: InboundCommandAuthorizer,
    resources: Arc<dyn ResourceStore>,
    scores: Arc<dyn CreditScoreStore>,
    distributor: Arc<EventDistributor>,
}

impl CommandConsumer {
    pub fn new(
        authorizer: InboundCommandAuthorizer,
        resources: Arc<dyn ResourceStore>,
        scores: Arc<dyn CreditScoreStore>,
        distributor: Arc<EventDistributor>,
    ) -> Self {
        Self {
            authorizer,
            resources,
            scores,
            distributor,
        }
    }

    /// Apply the allow-listed subset of an update command
    pub async fn handle_update(&self, command: UpdateCommand) -> CommandOutcome {
        let resource = match command.resource_type.parse::<ResourceType>() {
            Ok(resource) => resource,
            Err(reason) => {
                warn!(
                    requesting_service = %command.requesting_service,
                    resource_type = %command.resource_type,
                    "Update command for unknown resource dropped"
                );
                return CommandOutcome::Rejected { reason };
            }
        };

        if !self
            .authorizer
            .authorize(&command.requesting_service, Action::Update, resource)
        {
            warn!(
                requesting_service = %command.requesting_service,
                resource_type = %resource,
                company_id = %command.company_id,
                "Unauthorized update command dropped"
            );
            return CommandOutcome::Rejected {
                reason: format!(
                    "{} may not update {}",
                    command.requesting_service, resource
                ),
            };
        }

        let allowed = self.authorizer.allowed_fields(&command.requesting_service);
        let fields = self.authorizer.sanitize(&command.update_fields, &allowed);
        let applied_fields: Vec<String> = fields.keys().cloned().collect();
        let dropped_fields: Vec<String> = command
            .update_fields
            .keys()
            .filter(|key| !fields.contains_key(key.as_str()))
            .cloned()
            .collect();

        if !dropped_fields.is_empty() {
            debug!(
                requesting_service = %command.requesting_service,
                dropped = ?dropped_fields,
                "Dropped fields outside the allow-list"
            );
        }

        match self.resources.apply(resource, &command.company_id, &fields).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    company_id = %command.company_id,
                    resource_type = %resource,
                    "Update command for missing resource"
                );
                return CommandOutcome::NotFound;
            }
            Err(e) => {
                error!(
                    company_id = %command.company_id,
                    error = %e,
                    "Update command could not be applied"
                );
                return CommandOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        }

        info!(
            company_id = %command.company_id,
            requesting_service = %command.requesting_service,
            resource_type = %resource,
            applied = applied_fields.len(),
            "Update command applied"
        );

        if let Some(topic) = projection_topic(resource) {
            let payload = serde_json::json!({
                "company_id": command.company_id,
                "timestamp": Utc::now(),
                "request_id": command.request_id,
                "updated_fields": fields,
            });
            if let Err(e) = self
                .distributor
                .publish(topic, &payload, "Resource projection updated")
                .await
            {
                warn!(company_id = %command.company_id, error = %e, "Projection event not published");
            }
        }

        CommandOutcome::Applied {
            applied_fields,
            dropped_fields,
        }
    }

    /// Authorize, fetch and answer on the request's response topic
    pub async fn handle_read(&self, request: ReadRequest) -> ReadResponse {
        let response = self.read_response(&request).await;

        if let Err(e) = self
            .distributor
            .publish(&request.response_pattern, &response, "Read request answered")
            .await
        {
            error!(
                response_pattern = %request.response_pattern,
                entity_id = %request.entity_id,
                error = %e,
                "Read response not published"
            );
        }

        response
    }

    async fn read_response(&self, request: &ReadRequest) -> ReadResponse {
        let answer = |data, error: Option<String>, status| ReadResponse {
            request_id: request.request_id.clone(),
            entity_id: request.entity_id.clone(),
            data,
            error,
            status,
        };

        let resource = match request.resource_type() {
            Ok(resource) => resource,
            Err(reason) => return answer(None, Some(reason), 403),
        };

        if !self
            .authorizer
            .authorize(&request.requesting_service, Action::Read, resource)
        {
            warn!(
                requesting_service = %request.requesting_service,
                resource_type = %resource,
                "Unauthorized read request"
            );
            return answer(
                None,
                Some(format!(
                    "{} may not read {}",
                    request.requesting_service, resource
                )),
                403,
            );
        }

        let fetched = match resource {
            ResourceType::CreditScore => self
                .scores
                .find_latest(&request.entity_id)
                .await
                .and_then(|score| score.map(serde_json::to_value).transpose().map_err(Into::into)),
            other => self.resources.fetch(other, &request.entity_id).await,
        };

        match fetched {
            Ok(Some(data)) => answer(Some(data), None, 200),
            Ok(None) => answer(
                None,
                Some(format!("{} {} not found", resource, request.entity_id)),
                404,
            ),
            Err(e) => {
                error!(entity_id = %request.entity_id, error = %e, "Read request failed");
                answer(None, Some(e.to_string()), 500)
            }
        }
    }

    /// Answer a `credit-score.request` on `credit-score.response`
    pub async fn handle_score_request(&self, request: ScoreRequestPayload) -> ScoreResponsePayload {
        let mut response = ScoreResponsePayload {
            request_id: request.request_id.clone(),
            company_id: request.company_id.clone(),
            timestamp: Utc::now(),
            score: None,
            error: None,
        };

        if !self.authorizer.authorize(
            &request.requesting_service,
            Action::Read,
            ResourceType::CreditScore,
        ) {
            warn!(
                requesting_service = %request.requesting_service,
                "Unauthorized credit score request"
            );
            response.error = Some(format!(
                "{} may not read credit_score",
                request.requesting_service
            ));
        } else {
            match self.scores.find_latest(&request.company_id).await {
                Ok(Some(score)) => response.score = Some(score),
                Ok(None) => {
                    response.error = Some(format!(
                        "No credit score for company {}",
                        request.company_id
                    ))
                }
                Err(e) => response.error = Some(e.to_string()),
            }
        }

        if let Err(e) = self
            .distributor
            .publish(CREDIT_SCORE_RESPONSE, &response, "Credit score request answered")
            .await
        {
            error!(request_id = %request.request_id, error = %e, "Score response not published");
        }

        response
    }

    /// Route one bus event to its handler; unrelated topics are ignored
    pub async fn dispatch(&self, event: &DomainEvent) {
        let topic = resolve_topic(&event.topic);
        let payload = event.payload.clone();

        if topic == CUSTOMER_UPDATE_REQUEST {
            match serde_json::from_value::<UpdateCommand>(payload) {
                Ok(command) => {
                    self.handle_update(command).await;
                }
                Err(e) => warn!(event_id = %event.event_id, error = %e, "Malformed update command"),
            }
        } else if topic == CUSTOMER_DATA_REQUEST {
            match serde_json::from_value::<ReadRequest>(payload) {
                Ok(request) => {
                    self.handle_read(request).await;
                }
                Err(e) => warn!(event_id = %event.event_id, error = %e, "Malformed read request"),
            }
        } else if topic == CREDIT_SCORE_REQUEST {
            match serde_json::from_value::<ScoreRequestPayload>(payload) {
                Ok(request) => {
                    self.handle_score_request(request).await;
                }
                Err(e) => warn!(event_id = %event.event_id, error = %e, "Malformed score request"),
            }
        }
    }

    /// Consume bus events until the channel closes; spawn as a tokio task
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<DomainEvent>) {
        info!("Command consumer started");
        loop {
            match receiver.recv().await {
                Ok(event) => self.dispatch(&event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Command consumer lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Command consumer stopped");
    }
}

fn projection_topic(resource: ResourceType) -> Option<&'static str> {
    match resource {
        ResourceType::Customer => Some(CUSTOMER_UPDATED),
        ResourceType::Company => Some(COMPANY_PROFILE_UPDATED),
        ResourceType::CreditScore | ResourceType::FinancialData => None,
    }
}
