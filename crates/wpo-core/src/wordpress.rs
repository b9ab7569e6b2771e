//! The `Wordpress` desired-state resource.
//!
//! The specification is authored by users. Only `status` is written by the
//! controller, except for schema migration rewrites of deprecated fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::object::{Kind, Object, ObjectKey, ObjectMeta, ObjectRef, OwnerReference};

pub const DEFAULT_IMAGE: &str = "docker.io/bitpoke/wordpress-runtime";
pub const DEFAULT_TAG: &str = "latest";
pub const DEFAULT_IMAGE_PULL_POLICY: &str = "IfNotPresent";
pub const DEFAULT_REPLICAS: i32 = 1;
pub const DEFAULT_ROUTE_PATH: &str = "/";
pub const DEFAULT_CODE_MOUNT_PATH: &str = "/app/web/wp-content";
pub const DEFAULT_CODE_CONTENT_SUB_PATH: &str = "wp-content/";
pub const DEFAULT_MEDIA_MOUNT_PATH: &str = "/app/web/wp-content/uploads";

/// Label keys stamped on every child object.
pub mod labels {
    pub const NAME: &str = "app.kubernetes.io/name";
    pub const INSTANCE: &str = "app.kubernetes.io/instance";
    pub const PART_OF: &str = "app.kubernetes.io/part-of";
    pub const COMPONENT: &str = "app.kubernetes.io/component";
    pub const APP_NAME: &str = "wordpress";
}

/// One host/path pair served by the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub domain: String,
    #[serde(default)]
    pub path: String,
}

impl RouteSpec {
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Request for a persistent volume claim backing a volume category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaimSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
    /// Requested size, e.g. `10Gi`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeVolumeSpec {
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sub_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaVolumeSpec {
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordpressSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Deprecated: superseded by `routes`. Migrated on first reconcile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeVolumeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaVolumeSpec>,
    /// Extra labels propagated to every child object.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingress_annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret_ref: Option<String>,
}

impl WordpressSpec {
    /// Fills unset optional fields with built-in defaults. Idempotent.
    pub fn set_defaults(&mut self) {
        self.replicas.get_or_insert(DEFAULT_REPLICAS);
        self.image
            .get_or_insert_with(|| DEFAULT_IMAGE.to_string());
        self.tag.get_or_insert_with(|| DEFAULT_TAG.to_string());
        self.image_pull_policy
            .get_or_insert_with(|| DEFAULT_IMAGE_PULL_POLICY.to_string());

        for route in &mut self.routes {
            if route.path.is_empty() {
                route.path = DEFAULT_ROUTE_PATH.to_string();
            }
        }

        if let Some(code) = &mut self.code {
            code.mount_path
                .get_or_insert_with(|| DEFAULT_CODE_MOUNT_PATH.to_string());
            code.content_sub_path
                .get_or_insert_with(|| DEFAULT_CODE_CONTENT_SUB_PATH.to_string());
        }

        if let Some(media) = &mut self.media {
            media
                .mount_path
                .get_or_insert_with(|| DEFAULT_MEDIA_MOUNT_PATH.to_string());
        }
    }

    /// Returns a defaulted copy, leaving `self` untouched.
    pub fn with_defaults(&self) -> Self {
        let mut spec = self.clone();
        spec.set_defaults();
        spec
    }

    pub fn code_claim(&self) -> Option<&PersistentVolumeClaimSpec> {
        self.code.as_ref()?.persistent_volume_claim.as_ref()
    }

    pub fn media_claim(&self) -> Option<&PersistentVolumeClaimSpec> {
        self.media.as_ref()?.persistent_volume_claim.as_ref()
    }

    /// `image:tag` of the site runtime.
    pub fn image_reference(&self) -> String {
        let image = self.image.as_deref().unwrap_or(DEFAULT_IMAGE);
        let tag = self.tag.as_deref().unwrap_or(DEFAULT_TAG);
        format!("{image}:{tag}")
    }
}

/// Runtime facts observed from child objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordpressStatus {
    #[serde(default)]
    pub replicas: i32,
}

/// The child objects a Wordpress owns, including the retired cron job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Secret,
    Deployment,
    Service,
    Ingress,
    CodePvc,
    MediaPvc,
    /// Emitted by earlier releases; now only reaped.
    Cron,
}

impl Component {
    pub fn kind(&self) -> Kind {
        match self {
            Component::Secret => Kind::Secret,
            Component::Deployment => Kind::Deployment,
            Component::Service => Kind::Service,
            Component::Ingress => Kind::Ingress,
            Component::CodePvc | Component::MediaPvc => Kind::PersistentVolumeClaim,
            Component::Cron => Kind::CronJob,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Component::Secret => "-wp",
            Component::Deployment | Component::Service | Component::Ingress => "",
            Component::CodePvc => "-code",
            Component::MediaPvc => "-media",
            Component::Cron => "-wp-cron",
        }
    }

    /// Value of the `app.kubernetes.io/component` label.
    pub fn label(&self) -> &'static str {
        match self {
            Component::Secret => "secret",
            Component::Deployment => "web",
            Component::Service => "service",
            Component::Ingress => "ingress",
            Component::CodePvc => "code",
            Component::MediaPvc => "media",
            Component::Cron => "wp-cron",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wordpress {
    pub api_version: String,
    pub kind: Kind,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: WordpressSpec,
    #[serde(default)]
    pub status: WordpressStatus,
}

impl Wordpress {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, spec: WordpressSpec) -> Self {
        Self {
            api_version: Kind::Wordpress.api_version().to_string(),
            kind: Kind::Wordpress,
            metadata: ObjectMeta::new(namespace, name),
            spec,
            status: WordpressStatus::default(),
        }
    }

    pub fn from_object(object: &Object) -> Result<Self> {
        object.to_typed()
    }

    pub fn to_object(&self) -> Result<Object> {
        Object::from_typed(self)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn uid(&self) -> Option<&str> {
        self.metadata.uid.as_deref()
    }

    /// Deterministic name of a child component.
    pub fn component_name(&self, component: Component) -> String {
        format!("{}{}", self.metadata.name, component.suffix())
    }

    pub fn component_key(&self, component: Component) -> ObjectKey {
        ObjectKey::new(&self.metadata.namespace, self.component_name(component))
    }

    pub fn component_ref(&self, component: Component) -> ObjectRef {
        ObjectRef::new(component.kind(), &self.component_key(component))
    }

    /// Controller reference stamped on every child.
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference::controller(Kind::Wordpress, &self.metadata)
    }

    /// Labels selecting every object of this site.
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (labels::NAME.to_string(), labels::APP_NAME.to_string()),
            (labels::INSTANCE.to_string(), self.metadata.name.clone()),
        ])
    }

    /// Full label set for a component, user labels first so the standard
    /// keys always win.
    pub fn component_labels(&self, component: Component) -> BTreeMap<String, String> {
        let mut out = self.spec.labels.clone();
        out.extend(self.selector_labels());
        out.insert(labels::PART_OF.to_string(), labels::APP_NAME.to_string());
        out.insert(labels::COMPONENT.to_string(), component.label().to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn site() -> Wordpress {
        Wordpress::new("default", "blog", WordpressSpec::default())
    }

    #[test]
    fn test_component_names() {
        let wp = site();
        assert_eq!(wp.component_name(Component::Secret), "blog-wp");
        assert_eq!(wp.component_name(Component::Deployment), "blog");
        assert_eq!(wp.component_name(Component::Service), "blog");
        assert_eq!(wp.component_name(Component::Ingress), "blog");
        assert_eq!(wp.component_name(Component::CodePvc), "blog-code");
        assert_eq!(wp.component_name(Component::MediaPvc), "blog-media");
        assert_eq!(wp.component_name(Component::Cron), "blog-wp-cron");
        assert_eq!(Component::Cron.kind(), Kind::CronJob);
    }

    #[test]
    fn test_set_defaults_is_idempotent() {
        let mut spec = WordpressSpec {
            routes: vec![RouteSpec::new("example.com", "")],
            code: Some(CodeVolumeSpec::default()),
            media: Some(MediaVolumeSpec::default()),
            ..Default::default()
        };
        spec.set_defaults();
        let once = spec.clone();
        spec.set_defaults();

        assert_eq!(spec, once);
        assert_eq!(spec.replicas, Some(DEFAULT_REPLICAS));
        assert_eq!(spec.routes[0].path, "/");
        assert_eq!(
            spec.code.as_ref().and_then(|c| c.mount_path.as_deref()),
            Some(DEFAULT_CODE_MOUNT_PATH)
        );
        assert_eq!(spec.image_reference(), format!("{DEFAULT_IMAGE}:{DEFAULT_TAG}"));
    }

    #[test]
    fn test_defaults_keep_user_values() {
        let spec = WordpressSpec {
            replicas: Some(3),
            image: Some("registry.local/wp".into()),
            tag: Some("6.4".into()),
            ..Default::default()
        }
        .with_defaults();

        assert_eq!(spec.replicas, Some(3));
        assert_eq!(spec.image_reference(), "registry.local/wp:6.4");
    }

    #[test]
    fn test_wordpress_object_round_trip() {
        let value = json!({
            "apiVersion": "wordpress.presslabs.org/v1alpha1",
            "kind": "Wordpress",
            "metadata": {"name": "blog", "namespace": "default", "uid": "u-1"},
            "spec": {"domains": ["a.example.com"], "code": {"persistentVolumeClaim": {"storage": "1Gi"}}},
            "status": {"replicas": 2}
        });
        let object: Object = serde_json::from_value(value).unwrap();
        let wp = Wordpress::from_object(&object).unwrap();

        assert_eq!(wp.spec.domains, vec!["a.example.com".to_string()]);
        assert_eq!(wp.status.replicas, 2);
        assert!(wp.spec.code_claim().is_some());
        assert!(wp.spec.media_claim().is_none());
        let again = Wordpress::from_object(&wp.to_object().unwrap()).unwrap();
        assert_eq!(again, wp);
    }

    #[test]
    fn test_component_labels() {
        let mut wp = site();
        wp.spec
            .labels
            .insert(labels::INSTANCE.to_string(), "spoofed".to_string());
        wp.spec.labels.insert("team".to_string(), "web".to_string());

        let out = wp.component_labels(Component::Deployment);
        assert_eq!(out.get(labels::INSTANCE).map(String::as_str), Some("blog"));
        assert_eq!(out.get(labels::COMPONENT).map(String::as_str), Some("web"));
        assert_eq!(out.get("team").map(String::as_str), Some("web"));
    }
}
