use serde_json::json;
use wpo_core::{Object, PersistentVolumeClaimSpec};

use super::BuildError;

const DEFAULT_ACCESS_MODE: &str = "ReadWriteOnce";

pub(super) fn build(
    claim: Option<&PersistentVolumeClaimSpec>,
    field: &str,
    object: &mut Object,
) -> Result<(), BuildError> {
    let field = format!("{field}.persistentVolumeClaim");
    let claim = claim.ok_or_else(|| BuildError::invalid_field(&field, "not set"))?;
    let storage = claim
        .storage
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BuildError::invalid_field(format!("{field}.storage"), "must be set"))?;

    let access_modes = if claim.access_modes.is_empty() {
        vec![DEFAULT_ACCESS_MODE.to_string()]
    } else {
        claim.access_modes.clone()
    };

    object.update_object_field("spec", |spec| {
        spec.insert("accessModes".into(), json!(access_modes));
        spec.insert(
            "resources".into(),
            json!({"requests": {"storage": storage}}),
        );
        match &claim.storage_class_name {
            Some(class) => spec.insert("storageClassName".into(), json!(class)),
            None => spec.remove("storageClassName"),
        };
    });
    Ok(())
}
