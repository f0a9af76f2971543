//! The immutable set of flows advertised as tools.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::client::FlowDescriber;
use crate::config::FlowDefinition;
use crate::error::{CoreError, CoreResult};
use crate::types::{Flow, InputSchema};

/// Name (and flow id) of the built-in upload tool.
pub const UPLOAD_TOOL_NAME: &str = "sys_upload_file";

const UPLOAD_TOOL_DESCRIPTION: &str =
    "upload file. Format support: image(jpg、png、bmp、jpeg), doc(pdf)";

/// What to do when two flows resolve to the same tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameCollisionPolicy {
    /// The later flow shadows the earlier one in the name index.
    #[default]
    LastWins,
    /// Fail catalog construction with [`CoreError::DuplicateName`].
    Reject,
}

/// Registered flows in definition order plus a name index.
#[derive(Debug, Clone)]
pub struct FlowCatalog {
    flows: Vec<Flow>,
    index: HashMap<String, usize>,
}

impl FlowCatalog {
    /// Build the catalog, describing flows whose metadata is incomplete.
    ///
    /// Any describe failure aborts construction; no partial catalog is
    /// returned. The reserved upload tool is appended last and borrows the
    /// first flow's API key.
    pub async fn build(
        definitions: Vec<FlowDefinition>,
        describer: &dyn FlowDescriber,
        policy: NameCollisionPolicy,
    ) -> CoreResult<Self> {
        if definitions.is_empty() {
            return Err(CoreError::EmptyCatalog);
        }

        let mut flows = Vec::with_capacity(definitions.len() + 1);
        for def in definitions {
            flows.push(resolve_flow(def, describer).await?);
        }

        let upload = upload_flow(&flows[0]);
        flows.push(upload);

        let index = build_index(&flows, policy)?;
        info!("Flow catalog ready with {} tool(s)", flows.len());
        Ok(Self { flows, index })
    }

    pub fn lookup(&self, name: &str) -> CoreResult<&Flow> {
        self.index
            .get(name)
            .map(|&i| &self.flows[i])
            .ok_or_else(|| CoreError::UnknownTool(name.to_string()))
    }

    /// Flows in catalog order, upload tool last.
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

async fn resolve_flow(def: FlowDefinition, describer: &dyn FlowDescriber) -> CoreResult<Flow> {
    if !def.needs_describe() {
        debug!(flow_id = %def.flow_id, "Using locally declared metadata");
        return Ok(Flow {
            input_schema: InputSchema::from_params(&def.params),
            name: def.name.unwrap_or_default(),
            description: def.description.unwrap_or_default(),
            flow_id: def.flow_id,
            api_key: def.api_key,
        });
    }

    let info = describer.describe_flow(&def.flow_id, &def.api_key).await?;
    debug!(flow_id = %def.flow_id, name = %info.name, "Resolved flow metadata from remote");
    Ok(Flow {
        name: def.name.unwrap_or(info.name),
        description: def.description.unwrap_or(info.description),
        input_schema: info.input_schema,
        flow_id: def.flow_id,
        api_key: def.api_key,
    })
}

fn upload_flow(first: &Flow) -> Flow {
    Flow {
        flow_id: UPLOAD_TOOL_NAME.to_string(),
        name: UPLOAD_TOOL_NAME.to_string(),
        description: UPLOAD_TOOL_DESCRIPTION.to_string(),
        api_key: first.api_key.clone(),
        input_schema: InputSchema::new().with_property("file", "string", "file path", true),
    }
}

fn build_index(flows: &[Flow], policy: NameCollisionPolicy) -> CoreResult<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(flows.len());
    for (i, flow) in flows.iter().enumerate() {
        if let Some(previous) = index.insert(flow.name.clone(), i) {
            match policy {
                NameCollisionPolicy::Reject => {
                    return Err(CoreError::DuplicateName(flow.name.clone()));
                }
                NameCollisionPolicy::LastWins => warn!(
                    "Tool name conflict: '{}' (flow {}) shadows flow {}",
                    flow.name, flow.flow_id, flows[previous].flow_id
                ),
            }
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FlowInfo;
    use crate::types::ApiKey;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubDescriber {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    impl StubDescriber {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0), fail_on: None }
        }
    }

    #[async_trait]
    impl FlowDescriber for StubDescriber {
        async fn describe_flow(&self, flow_id: &str, _api_key: &ApiKey) -> CoreResult<FlowInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(flow_id) {
                return Err(CoreError::Remote(format!("code 10001 for {}", flow_id)));
            }
            Ok(FlowInfo {
                name: format!("remote_{}", flow_id),
                description: format!("remote description of {}", flow_id),
                input_schema: InputSchema::new().with_property("AGENT_USER_INPUT", "string", "", true),
            })
        }
    }

    #[tokio::test]
    async fn catalog_has_n_plus_one_flows_with_upload_last() {
        let describer = StubDescriber::new();
        let defs = vec![FlowDefinition::new("1", "k1"), FlowDefinition::new("2", "k2")];
        let catalog = FlowCatalog::build(defs, &describer, NameCollisionPolicy::LastWins)
            .await
            .unwrap();

        assert_eq!(catalog.len(), 3);
        let upload = catalog.lookup(UPLOAD_TOOL_NAME).unwrap();
        assert_eq!(upload.flow_id, UPLOAD_TOOL_NAME);
        assert_eq!(upload.api_key.expose(), "k1");
        assert_eq!(upload.input_schema.required, vec!["file"]);
        assert_eq!(catalog.flows().last().unwrap().name, UPLOAD_TOOL_NAME);
    }

    #[tokio::test]
    async fn empty_definitions_fail() {
        let err = FlowCatalog::build(vec![], &StubDescriber::new(), NameCollisionPolicy::LastWins)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyCatalog));
    }

    #[tokio::test]
    async fn describe_only_when_metadata_missing() {
        let describer = StubDescriber::new();
        let defs = vec![
            FlowDefinition::new("1", "k").with_name("local").with_description("local desc"),
            FlowDefinition::new("2", "k").with_name("partial"),
        ];
        let catalog = FlowCatalog::build(defs, &describer, NameCollisionPolicy::LastWins)
            .await
            .unwrap();

        assert_eq!(describer.calls.load(Ordering::SeqCst), 1);
        let partial = catalog.lookup("partial").unwrap();
        assert_eq!(partial.description, "remote description of 2");
        assert_eq!(partial.input_schema.required, vec!["AGENT_USER_INPUT"]);
        assert!(catalog.lookup("local").unwrap().input_schema.properties.is_empty());
    }

    #[tokio::test]
    async fn describe_failure_aborts_construction() {
        let describer = StubDescriber { calls: AtomicUsize::new(0), fail_on: Some("2") };
        let defs = vec![FlowDefinition::new("1", "k"), FlowDefinition::new("2", "k")];
        let err = FlowCatalog::build(defs, &describer, NameCollisionPolicy::LastWins)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Remote(_)));
    }

    #[tokio::test]
    async fn later_flow_wins_name_collision() {
        let defs = vec![
            FlowDefinition::new("first", "k").with_name("same").with_description("a"),
            FlowDefinition::new("second", "k").with_name("same").with_description("b"),
        ];
        let catalog = FlowCatalog::build(defs, &StubDescriber::new(), NameCollisionPolicy::LastWins)
            .await
            .unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.lookup("same").unwrap().flow_id, "second");
    }

    #[tokio::test]
    async fn user_flow_named_like_upload_tool_is_shadowed() {
        let defs = vec![FlowDefinition::new("x", "k")
            .with_name(UPLOAD_TOOL_NAME)
            .with_description("impostor")];
        let catalog = FlowCatalog::build(defs, &StubDescriber::new(), NameCollisionPolicy::LastWins)
            .await
            .unwrap();
        assert_eq!(catalog.lookup(UPLOAD_TOOL_NAME).unwrap().flow_id, UPLOAD_TOOL_NAME);
    }

    #[tokio::test]
    async fn strict_policy_rejects_duplicates() {
        let defs = vec![
            FlowDefinition::new("first", "k").with_name("same").with_description("a"),
            FlowDefinition::new("second", "k").with_name("same").with_description("b"),
        ];
        let err = FlowCatalog::build(defs, &StubDescriber::new(), NameCollisionPolicy::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName(name) if name == "same"));
    }

    #[tokio::test]
    async fn unknown_name_is_unknown_tool() {
        let catalog = FlowCatalog::build(
            vec![FlowDefinition::new("1", "k")],
            &StubDescriber::new(),
            NameCollisionPolicy::LastWins,
        )
        .await
        .unwrap();
        assert!(matches!(catalog.lookup("nonexistent"), Err(CoreError::UnknownTool(n)) if n == "nonexistent"));
    }
}
