use serde_json::{Value, json};
use wpo_core::wordpress::{
    DEFAULT_CODE_CONTENT_SUB_PATH, DEFAULT_CODE_MOUNT_PATH, DEFAULT_IMAGE_PULL_POLICY,
    DEFAULT_MEDIA_MOUNT_PATH, DEFAULT_REPLICAS,
};
use wpo_core::{Component, Kind, Object, Wordpress};

use super::{BuildError, SyncOutputs};

const CONTAINER_NAME: &str = "wordpress";
const HTTP_PORT: u16 = 8080;

pub(super) fn build(
    owner: &Wordpress,
    outputs: &SyncOutputs,
    object: &mut Object,
) -> Result<(), BuildError> {
    let spec = &owner.spec;
    let replicas = spec.replicas.unwrap_or(DEFAULT_REPLICAS);
    if replicas < 0 {
        return Err(BuildError::invalid_field(
            "spec.replicas",
            format!("{replicas} is negative"),
        ));
    }
    if spec.image.as_deref().is_some_and(str::is_empty) {
        return Err(BuildError::invalid_field("spec.image", "must not be empty"));
    }

    let secret_key = owner.component_key(Component::Secret);
    let secret = outputs
        .get(Kind::Secret, &secret_key)
        .ok_or_else(|| BuildError::missing_dependency(Kind::Secret, &secret_key.name))?;

    let env: Vec<Value> = spec
        .env
        .iter()
        .map(|var| json!({"name": var.name, "value": var.value}))
        .collect();

    let (volumes, mounts) = volumes(owner);

    let container = json!({
        "name": CONTAINER_NAME,
        "image": spec.image_reference(),
        "imagePullPolicy": spec.image_pull_policy.as_deref().unwrap_or(DEFAULT_IMAGE_PULL_POLICY),
        "env": env,
        "envFrom": [{"secretRef": {"name": secret.metadata.name}}],
        "ports": [{"name": "http", "containerPort": HTTP_PORT, "protocol": "TCP"}],
        "volumeMounts": mounts,
    });

    let template = json!({
        "metadata": {"labels": owner.component_labels(Component::Deployment)},
        "spec": {
            "containers": [container],
            "volumes": volumes,
        }
    });

    object.update_object_field("spec", |deployment| {
        deployment.insert("replicas".into(), json!(replicas));
        deployment.insert(
            "selector".into(),
            json!({"matchLabels": owner.selector_labels()}),
        );
        deployment.insert("template".into(), template);
    });
    Ok(())
}

/// Pod volumes and container mounts for the code and media categories.
/// A category without a claim falls back to an `emptyDir`.
fn volumes(owner: &Wordpress) -> (Vec<Value>, Vec<Value>) {
    let mut volumes = Vec::new();
    let mut mounts = Vec::new();

    if let Some(code) = &owner.spec.code {
        volumes.push(volume(
            "code",
            code.persistent_volume_claim
                .as_ref()
                .map(|_| owner.component_name(Component::CodePvc)),
            code.read_only,
        ));
        mounts.push(json!({
            "name": "code",
            "mountPath": code.mount_path.as_deref().unwrap_or(DEFAULT_CODE_MOUNT_PATH),
            "subPath": code.content_sub_path.as_deref().unwrap_or(DEFAULT_CODE_CONTENT_SUB_PATH),
            "readOnly": code.read_only,
        }));
    }

    if let Some(media) = &owner.spec.media {
        volumes.push(volume(
            "media",
            media
                .persistent_volume_claim
                .as_ref()
                .map(|_| owner.component_name(Component::MediaPvc)),
            media.read_only,
        ));
        mounts.push(json!({
            "name": "media",
            "mountPath": media.mount_path.as_deref().unwrap_or(DEFAULT_MEDIA_MOUNT_PATH),
            "readOnly": media.read_only,
        }));
    }

    (volumes, mounts)
}

fn volume(name: &str, claim: Option<String>, read_only: bool) -> Value {
    match claim {
        Some(claim_name) => json!({
            "name": name,
            "persistentVolumeClaim": {"claimName": claim_name, "readOnly": read_only},
        }),
        None => json!({"name": name, "emptyDir": {}}),
    }
}
