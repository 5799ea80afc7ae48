//! Selecting the Kafka or Service Registry instance later commands act on.

use crate::{
    Error, Result,
    api::{Instance, StatusMessages},
    config::{ServiceKind, ServiceRef},
    connection::AuthPolicy,
    ctx::Ctx,
};

const KAFKA_MESSAGES: StatusMessages = StatusMessages(&[
    (401, "Your session is not authorized to read Kafka instances"),
    (403, "You do not have permission to access this Kafka instance"),
    (404, "Kafka instance not found"),
    (423, "The Kafka instance is locked, try again later"),
    (500, "The Kafka management API failed to process the request"),
    (503, "The Kafka management API is unavailable, try again later"),
]);

const REGISTRY_MESSAGES: StatusMessages = StatusMessages(&[
    (401, "Your session is not authorized to read Service Registry instances"),
    (403, "You do not have permission to access this Service Registry instance"),
    (404, "Service Registry instance not found"),
    (423, "The Service Registry instance is locked, try again later"),
    (500, "The Service Registry management API failed to process the request"),
    (503, "The Service Registry management API is unavailable, try again later"),
]);

pub(crate) fn status_messages(kind: ServiceKind) -> &'static StatusMessages {
    match kind {
        ServiceKind::Kafka => &KAFKA_MESSAGES,
        ServiceKind::ServiceRegistry => &REGISTRY_MESSAGES,
    }
}

const SEARCH_PAGE_SIZE: u32 = 100;

/// How the user picked the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceSelector {
    Id(String),
    Name(String),
}

pub async fn use_command(ctx: &Ctx, kind: ServiceKind, selector: InstanceSelector) -> Result<()> {
    let connection = ctx
        .connection_factory()
        .obtain(AuthPolicy::RequirePrimaryOnly)
        .await?;
    let api = connection.api()?;
    let client = match kind {
        ServiceKind::Kafka => api.kafka_mgmt(),
        ServiceKind::ServiceRegistry => api.service_registry_mgmt(),
    };
    let messages = status_messages(kind);

    let instance = match selector {
        InstanceSelector::Id(id) => {
            client
                .get(id)
                .execute()
                .await
                .map_err(|e| e.into_error(messages))?
                .0
        }
        InstanceSelector::Name(name) => {
            let (list, _) = client
                .list()
                .search(format!("name = {name}"))
                .page(1)
                .size(SEARCH_PAGE_SIZE)
                .execute()
                .await
                .map_err(|e| e.into_error(messages))?;
            find_by_name(list.items, &name).ok_or_else(|| {
                Error::Other(format!("{} \"{name}\" not found", kind.display_name()))
            })?
        }
    };

    let mut config = connection.into_config();
    *config.bookmark_mut(kind) = Some(ServiceRef {
        instance_id: instance.id.clone(),
        name: instance.name.clone(),
    });
    ctx.store().save(&config)?;

    if ctx.output.json {
        ctx.output.json_value(&instance)?;
    } else {
        ctx.output.success(format!(
            "{} \"{}\" has been set as the current instance",
            kind.display_name(),
            instance.name
        ))?;
    }
    Ok(())
}

/// The search filter is a prefix match on some deployments, so the exact name
/// is checked here.
fn find_by_name(items: Vec<Instance>, name: &str) -> Option<Instance> {
    items.into_iter().find(|i| i.name == name)
}
