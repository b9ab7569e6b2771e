use serde_json::{Value, json};
use wpo_core::{Component, Object, Wordpress};

use super::{APPLIED_INGRESS_ANNOTATIONS_ANNOTATION, BuildError, apply_tracked, set_record};

pub(super) fn build(owner: &Wordpress, object: &mut Object) -> Result<(), BuildError> {
    let service = owner.component_name(Component::Service);
    let mut rules = Vec::with_capacity(owner.spec.routes.len());
    let mut hosts: Vec<&str> = Vec::new();

    for (i, route) in owner.spec.routes.iter().enumerate() {
        if route.domain.is_empty() {
            return Err(BuildError::invalid_field(
                format!("spec.routes[{i}].domain"),
                "must not be empty",
            ));
        }
        if !route.path.starts_with('/') {
            return Err(BuildError::invalid_field(
                format!("spec.routes[{i}].path"),
                format!("{:?} must start with '/'", route.path),
            ));
        }
        if !hosts.contains(&route.domain.as_str()) {
            hosts.push(&route.domain);
        }
        rules.push(json!({
            "host": route.domain,
            "http": {
                "paths": [{
                    "path": route.path,
                    "pathType": "Prefix",
                    "backend": {
                        "service": {"name": service, "port": {"name": "http"}}
                    }
                }]
            }
        }));
    }

    let annotations = &mut object.metadata.annotations;
    let previous = annotations.get(APPLIED_INGRESS_ANNOTATIONS_ANNOTATION).cloned();
    let applied = apply_tracked(
        annotations,
        owner.spec.ingress_annotations.clone(),
        previous.as_deref(),
        owner.spec.ingress_annotations.keys(),
    );
    set_record(annotations, APPLIED_INGRESS_ANNOTATIONS_ANNOTATION, applied);

    object.update_object_field("spec", |spec| {
        spec.insert("rules".into(), Value::Array(rules));
        match &owner.spec.tls_secret_ref {
            Some(secret) => spec.insert("tls".into(), json!([{"hosts": hosts, "secretName": secret}])),
            None => spec.remove("tls"),
        };
    });
    Ok(())
}
