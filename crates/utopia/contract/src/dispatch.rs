//! String-argument entry point.
//!
//! Mirrors how a ledger peer delivers invocations: a function name plus a
//! list of string arguments. Responses are canonical JSON bytes.

use crate::contract::UtopiaContract;
use crate::error::{ContractError, ContractResult};
use serde_json::{json, Value};
use tracing::debug;
use utopia_ledger::{codec, TxHeader};
use utopia_registry::{
    Credentials, IdMode, NewParticipant, NewPeerInteraction, NewProject, NewProjectInteraction,
};
use utopia_types::{InteractionId, ParticipantId, Payload, ProjectId};

/// Every function [`UtopiaContract::invoke`] understands.
pub const FUNCTIONS: &[&str] = &[
    "init",
    "getInitStatus",
    "createParticipant",
    "createProject",
    "createProjectInteraction",
    "createPeerInteraction",
    "validateInteraction",
    "getParticipant",
    "getProject",
    "getInteraction",
    "listParticipants",
    "listProjects",
    "listInteractions",
    "getParticipantCount",
    "getProjectCount",
    "getInteractionCount",
];

impl UtopiaContract {
    /// Run the named operation with positional string arguments.
    ///
    /// In `caller_supplied` ID mode every create function takes the explicit
    /// ID as its first argument; an empty string asks for an allocated one.
    /// Trailing credential arguments are optional.
    pub async fn invoke(
        &self,
        header: TxHeader,
        function: &str,
        args: &[String],
    ) -> ContractResult<Vec<u8>> {
        debug!(function, argc = args.len(), "invoke");
        let mut args = Args::new(function, args);
        let id_mode = self.config().id_mode;

        let response = match function {
            "init" => {
                args.finish()?;
                self.init(header).await?;
                json!({ "initialized": true })
            }
            "getInitStatus" => {
                args.finish()?;
                json!({ "initialized": self.get_init_status(header).await? })
            }
            "createParticipant" => {
                let request = NewParticipant {
                    id: args.explicit_id(id_mode)?.map(ParticipantId::new),
                    name: args.required("name")?.to_string(),
                    email: args.required("contact")?.to_string(),
                    role: args.required("role")?.to_string(),
                    credential: args.optional(),
                };
                args.finish()?;
                to_value(&self.create_participant(header, request).await?)?
            }
            "createProject" => {
                let id = args.explicit_id(id_mode)?.map(ProjectId::new);
                let name = args.required("name")?.to_string();
                let start_date = args.required("startDate")?.to_string();
                let end_date = args.required("endDate")?.to_string();
                let description = args.required("description")?.to_string();
                let contributors = args.participant_list("contributors")?;
                let validators = args.participant_list("validators")?;
                let request = NewProject {
                    id,
                    name,
                    start_date,
                    end_date,
                    description,
                    contributors,
                    validators,
                    credential: args.optional(),
                };
                args.finish()?;
                to_value(&self.create_project(header, request).await?)?
            }
            "createProjectInteraction" => {
                let request = NewProjectInteraction {
                    id: args.explicit_id(id_mode)?.map(InteractionId::new),
                    project_id: ProjectId::new(args.required("projectId")?),
                    participant_id: ParticipantId::new(args.required("participantId")?),
                    payload: args.payload()?,
                };
                let credentials = args.credentials();
                args.finish()?;
                to_value(&self.create_project_interaction(header, request, credentials).await?)?
            }
            "createPeerInteraction" => {
                let request = NewPeerInteraction {
                    id: args.explicit_id(id_mode)?.map(InteractionId::new),
                    participant_id_a: ParticipantId::new(args.required("participantIdA")?),
                    participant_id_b: ParticipantId::new(args.required("participantIdB")?),
                    payload: args.payload()?,
                };
                let credentials = Credentials {
                    participant: args.optional(),
                    project: None,
                };
                args.finish()?;
                to_value(&self.create_peer_interaction(header, request, credentials).await?)?
            }
            "validateInteraction" => {
                let interaction_id = InteractionId::new(args.required("interactionId")?);
                let approver = ParticipantId::new(args.required("actingParticipantId")?);
                let credentials = args.credentials();
                args.finish()?;
                to_value(
                    &self
                        .validate_interaction(header, &interaction_id, &approver, credentials)
                        .await?,
                )?
            }
            "getParticipant" => {
                let id = ParticipantId::new(args.required("id")?);
                args.finish()?;
                to_value(&self.get_participant(header, &id).await?)?
            }
            "getProject" => {
                let id = ProjectId::new(args.required("id")?);
                args.finish()?;
                to_value(&self.get_project(header, &id).await?)?
            }
            "getInteraction" => {
                let id = InteractionId::new(args.required("id")?);
                args.finish()?;
                to_value(&self.get_interaction(header, &id).await?)?
            }
            "listParticipants" => {
                args.finish()?;
                to_value(&self.list_participants(header).await?)?
            }
            "listProjects" => {
                args.finish()?;
                to_value(&self.list_projects(header).await?)?
            }
            "listInteractions" => {
                args.finish()?;
                to_value(&self.list_interactions(header).await?)?
            }
            "getParticipantCount" => {
                args.finish()?;
                json!({ "count": self.participant_count(header).await? })
            }
            "getProjectCount" => {
                args.finish()?;
                json!({ "count": self.project_count(header).await? })
            }
            "getInteractionCount" => {
                args.finish()?;
                json!({ "count": self.interaction_count(header).await? })
            }
            other => return Err(ContractError::UnknownFunction(other.to_string())),
        };

        Ok(codec::encode(&response)?)
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> ContractResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| ContractError::Ledger(utopia_ledger::LedgerError::from(err)))
}

/// Cursor over positional arguments.
struct Args<'a> {
    function: &'a str,
    values: &'a [String],
    next: usize,
}

impl<'a> Args<'a> {
    fn new(function: &'a str, values: &'a [String]) -> Self {
        Self {
            function,
            values,
            next: 0,
        }
    }

    fn bad(&self, reason: impl Into<String>) -> ContractError {
        ContractError::BadArguments {
            function: self.function.to_string(),
            reason: reason.into(),
        }
    }

    fn required(&mut self, name: &str) -> ContractResult<&'a str> {
        let value = self
            .values
            .get(self.next)
            .ok_or_else(|| self.bad(format!("missing argument {}", name)))?;
        self.next += 1;
        Ok(value.as_str())
    }

    /// Next argument if present and non-empty.
    fn optional(&mut self) -> Option<String> {
        let value = self.values.get(self.next)?;
        self.next += 1;
        (!value.is_empty()).then(|| value.clone())
    }

    fn explicit_id(&mut self, mode: IdMode) -> ContractResult<Option<String>> {
        match mode {
            IdMode::Allocated => Ok(None),
            IdMode::CallerSupplied => {
                let raw = self.required("id")?;
                Ok((!raw.is_empty()).then(|| raw.to_string()))
            }
        }
    }

    fn credentials(&mut self) -> Credentials {
        Credentials {
            participant: self.optional(),
            project: self.optional(),
        }
    }

    /// A JSON array of IDs or comma-separated text.
    fn participant_list(&mut self, name: &str) -> ContractResult<Vec<ParticipantId>> {
        let raw = self.required(name)?.trim();
        let ids: Vec<String> = if raw.starts_with('[') {
            serde_json::from_str(raw)
                .map_err(|err| self.bad(format!("{} is not a JSON string array: {}", name, err)))?
        } else {
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect()
        };
        Ok(ids.into_iter().map(ParticipantId::new).collect())
    }

    /// Tagged payload JSON, the `{"amount", "currency"}` / `{"text"}` shorthands,
    /// or plain text taken as a description.
    fn payload(&mut self) -> ContractResult<Payload> {
        let raw = self.required("payload")?;
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => value,
            _ => return Ok(Payload::description(raw)),
        };
        if value.get("type").is_some() {
            return serde_json::from_value(value)
                .map_err(|err| self.bad(format!("malformed payload: {}", err)));
        }
        if let Some(amount) = value.get("amount") {
            let amount = amount
                .as_u64()
                .ok_or_else(|| self.bad("payload amount must be a non-negative integer"))?;
            return Ok(match value.get("currency").and_then(Value::as_str) {
                Some(currency) => Payload::investment(amount, currency),
                None => Payload::amount(amount),
            });
        }
        match value.get("text").and_then(Value::as_str) {
            Some(text) => Ok(Payload::description(text)),
            None => Err(self.bad("payload needs an amount or a text")),
        }
    }

    fn finish(self) -> ContractResult<()> {
        if self.next < self.values.len() {
            return Err(self.bad(format!(
                "expected at most {} arguments, got {}",
                self.next,
                self.values.len()
            )));
        }
        Ok(())
    }
}
