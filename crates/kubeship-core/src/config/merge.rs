//! Configuration layer merging logic
//!
//! Implements the 2-layer merge strategy:
//! Global -> Project

use super::schema::{ClusterConfig, DefaultsConfig, KubeshipConfig};

/// Merge the configuration layers
///
/// # Arguments
/// * `global` - Global configuration from ~/.config/kubeship/kubeship.toml
/// * `project` - Project configuration from ./kubeship.toml
///
/// # Returns
/// Merged configuration where every field set in the project layer wins
pub fn merge_configs(
    global: Option<KubeshipConfig>,
    project: Option<KubeshipConfig>,
) -> KubeshipConfig {
    let mut merged = global.unwrap_or_default();

    if let Some(project) = project {
        merge_defaults(&mut merged.defaults, project.defaults);
        merge_cluster(&mut merged.cluster, project.cluster);
    }

    merged
}

fn merge_defaults(base: &mut DefaultsConfig, overlay: DefaultsConfig) {
    overlay_field(&mut base.app_name, overlay.app_name);
    overlay_field(&mut base.image, overlay.image);
    overlay_field(&mut base.namespace, overlay.namespace);
    overlay_field(&mut base.port, overlay.port);
    overlay_field(&mut base.replicas, overlay.replicas);
    overlay_field(&mut base.cpu_request, overlay.cpu_request);
    overlay_field(&mut base.cpu_limit, overlay.cpu_limit);
    overlay_field(&mut base.memory_request, overlay.memory_request);
    overlay_field(&mut base.memory_limit, overlay.memory_limit);
    overlay_field(&mut base.output_dir, overlay.output_dir);
}

fn merge_cluster(base: &mut ClusterConfig, overlay: ClusterConfig) {
    overlay_field(&mut base.field_manager, overlay.field_manager);
}

fn overlay_field<T>(base: &mut Option<T>, overlay: Option<T>) {
    if overlay.is_some() {
        *base = overlay;
    }
}
