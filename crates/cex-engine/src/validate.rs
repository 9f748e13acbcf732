//! The validator (C5): two passes, every finding accumulated into one
//! [`ValidationFailure`] rather than failing at the first defect.

use std::collections::HashSet;

use camino::Utf8Path;
use cex_utils::error::ValidationFailure;

use crate::data::DataInfo;
use crate::graph::{CycleDetected, Graph};
use crate::match_rules::{best_match, MatchOutcome};
use crate::namespace::Namespace;
use crate::node::Node;
use crate::serializer::{resolve_serializer, SerializerRegistry};

/// Validate a namespace and, on success, return the graph it built along
/// the way (the caller needs it again for preparation/execution, and
/// re-deriving it would repeat the same DFS for no reason).
pub fn validate_namespace(
    namespace: &Namespace,
    namespace_root: &Utf8Path,
    engine_registry: &SerializerRegistry,
) -> Result<Graph, ValidationFailure> {
    let mut messages = Vec::new();

    if namespace.root_nodes.is_empty() {
        messages.push(format!("no root nodes provided to namespace {}", namespace.name));
    }

    let graph = match Graph::build(&namespace.root_nodes) {
        Ok(graph) => graph,
        Err(CycleDetected) => {
            messages.push(format!("cycle detected in namespace {}", namespace.name));
            return Err(ValidationFailure::new(messages));
        }
    };

    for node in &graph.topo_order {
        validate_node(node, &mut messages);
    }

    for node in &graph.topo_order {
        let predecessor_outputs: Vec<DataInfo> = graph
            .predecessors(node)
            .iter()
            .filter_map(|p| p.output_information())
            .collect();

        let file_inputs = match node.input_directory.as_ref() {
            Some(dir) => {
                crate::node::available_file_inputs(namespace_root.join(dir).as_std_path())
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };

        let available: Vec<DataInfo> = predecessor_outputs
            .into_iter()
            .chain(file_inputs)
            .collect();

        for param in &node.params {
            let aliases = node.input_aliases(&param.name);
            match best_match(&aliases, &param.type_tag, available.iter()) {
                MatchOutcome::Unsatisfied => messages.push(format!(
                    "no suitable input found for input `{}` of type `{}` of node `{}` in namespace `{}`",
                    param.name, param.type_tag, node.name, namespace.name
                )),
                MatchOutcome::Ambiguous => messages.push(format!(
                    "ambiguous inputs detected for input `{}` of type `{}` of node `{}` in namespace `{}`",
                    param.name, param.type_tag, node.name, namespace.name
                )),
                MatchOutcome::Resolved(candidate) => {
                    let node_override = node.input_serializers.get(&param.name);
                    if let Err(e) =
                        resolve_serializer(candidate, node_override, &namespace.serializers, engine_registry)
                    {
                        messages.push(format!(
                            "could not resolve a serializer for input `{}` of node `{}`: {e}",
                            param.name, node.name
                        ));
                    }
                }
            }
        }
    }

    if messages.is_empty() {
        Ok(graph)
    } else {
        Err(ValidationFailure::new(messages))
    }
}

fn validate_node(node: &Node, messages: &mut Vec<String>) {
    if node.output_name.is_some() && node.return_type.is_none() {
        messages.push(format!(
            "function output must be annotated with a type if node `{}` produces an output",
            node.name
        ));
    }

    let mut seen = HashSet::new();
    for aliases in node.input_aliases.values() {
        for alias in aliases {
            if !seen.insert(alias) {
                messages.push(format!("duplicate input alias `{alias}` on node `{}`", node.name));
            }
        }
    }
}
