use serde_json::json;
use wpo_core::{Object, Wordpress};

use super::BuildError;

pub(super) fn build(owner: &Wordpress, object: &mut Object) -> Result<(), BuildError> {
    let selector = owner.selector_labels();
    object.update_object_field("spec", |spec| {
        spec.insert("type".into(), json!("ClusterIP"));
        spec.insert("selector".into(), json!(selector));
        spec.insert(
            "ports".into(),
            json!([{
                "name": "http",
                "port": 80,
                "protocol": "TCP",
                "targetPort": "http",
            }]),
        );
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use wpo_core::{Kind, ObjectKey, WordpressSpec};

    use super::*;

    #[test]
    fn test_service_keeps_assigned_cluster_ip() {
        let wp = Wordpress::new("default", "blog", WordpressSpec::default());
        let mut service = Object::new(Kind::Service, &ObjectKey::new("default", "blog"));
        service.set_field("spec", json!({"clusterIP": "10.0.0.12"}));

        build(&wp, &mut service).unwrap();

        let spec = service.field("spec").unwrap();
        assert_eq!(spec["clusterIP"], "10.0.0.12");
        assert_eq!(spec["ports"][0]["port"], 80);
        assert_eq!(spec["selector"]["app.kubernetes.io/instance"], "blog");
    }
}
