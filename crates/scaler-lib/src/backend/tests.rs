//! Registry and backend construction tests

use super::*;
use crate::estimator::{CapacitySource, NodeCapacityEstimator};
use std::sync::atomic::{AtomicUsize, Ordering};

const GPU_MEMORY: &str = "example.com/gpu-memory";
const MARKER: &str = "accelerator";

fn specs(values: &[&str]) -> DiscoveryOptions {
    DiscoveryOptions::from_specs(values.iter().copied())
}

fn build_spotinst(values: &[&str]) -> Result<Arc<dyn Backend>> {
    BackendRegistry::builtin().build(
        SpotinstBackend::NAME,
        &BackendOptions::default(),
        &specs(values),
        &ResourceLimiter::default(),
    )
}

fn catalog() -> BackendOptions {
    let mut options = BackendOptions {
        cluster_name: "test".to_string(),
        ..Default::default()
    };
    options.templates.insert(
        "g5.xlarge".to_string(),
        ComputeNode::new("g5")
            .with_capacity("cpu", 4000u64)
            .with_capacity(GPU_MEMORY, 24u64),
    );
    options
}

mod registry {
    use super::*;

    #[test]
    fn test_empty_name_resolves_default() {
        let registry = BackendRegistry::builtin();
        let default = registry.resolve("").unwrap();
        let named = registry.resolve(registry.default_name()).unwrap();

        assert!(Arc::ptr_eq(default, named));
        assert_eq!(registry.default_name(), SpotinstBackend::NAME);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let registry = BackendRegistry::builtin();

        assert!(matches!(
            registry.resolve("gce"),
            Err(ScalerError::UnknownBackend(name)) if name == "gce"
        ));
        assert!(matches!(
            registry.build(
                "gce",
                &BackendOptions::default(),
                &DiscoveryOptions::default(),
                &ResourceLimiter::default()
            ),
            Err(ScalerError::UnknownBackend(_))
        ));
    }

    #[test]
    fn test_builtin_names() {
        let registry = BackendRegistry::builtin();
        assert_eq!(registry.names(), vec!["spotinst", "labels"]);
        assert_eq!(
            registry.descriptors().iter().filter(|d| d.is_default).count(),
            1
        );
    }

    #[test]
    fn test_injected_fake_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let registry = BackendRegistry::builder()
            .register("fake", move |options, discovery, limiter| {
                counter.fetch_add(1, Ordering::SeqCst);
                SpotinstBackend::build(options, discovery, limiter)
            })
            .register("other", LabelBackend::build)
            .default_backend("fake")
            .build()
            .unwrap();

        let backend = registry
            .build(
                "",
                &BackendOptions::default(),
                &specs(&["pool:0:2"]),
                &ResourceLimiter::default(),
            )
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.node_groups().len(), 1);
        assert_eq!(registry.default_name(), "fake");
    }

    #[test]
    fn test_default_need_not_be_registered_first() {
        let registry = BackendRegistry::builder()
            .register("first", SpotinstBackend::build)
            .register("second", LabelBackend::build)
            .default_backend("second")
            .build()
            .unwrap();

        assert_eq!(registry.default_name(), "second");
        let flags: Vec<bool> = registry.descriptors().iter().map(|d| d.is_default).collect();
        assert_eq!(flags, vec![false, true]);

        let backend = registry
            .build(
                "",
                &BackendOptions::default(),
                &specs(&["pool:1:2"]),
                &ResourceLimiter::default(),
            )
            .unwrap();
        assert_eq!(backend.name(), LabelBackend::NAME);
    }

    #[test]
    fn test_builder_enforces_table_invariants() {
        let missing_default = BackendRegistry::builder()
            .register("a", SpotinstBackend::build)
            .build();
        assert!(matches!(missing_default, Err(ScalerError::InvalidOptions(_))));

        let unknown_default = BackendRegistry::builder()
            .register("a", SpotinstBackend::build)
            .default_backend("b")
            .build();
        assert!(matches!(unknown_default, Err(ScalerError::InvalidOptions(_))));

        let duplicate = BackendRegistry::builder()
            .register("a", SpotinstBackend::build)
            .register("a", LabelBackend::build)
            .default_backend("a")
            .build();
        assert!(matches!(duplicate, Err(ScalerError::InvalidOptions(_))));

        let empty = BackendRegistry::builder().default_backend("a").build();
        assert!(empty.is_err());
    }

    #[test]
    fn test_malformed_limiter_is_rejected_at_build() {
        let mut limiter = ResourceLimiter::default();
        limiter.min.insert(GPU_MEMORY.to_string(), Quantity::new(10));
        limiter.max.insert(GPU_MEMORY.to_string(), Quantity::new(4));

        let result = BackendRegistry::builtin().build(
            "",
            &BackendOptions::default(),
            &specs(&["pool:0:2"]),
            &limiter,
        );
        assert!(matches!(result, Err(ScalerError::InvalidOptions(_))));
    }

    #[test]
    fn test_template_without_capacity_is_rejected_at_build() {
        let mut options = BackendOptions::default();
        options
            .templates
            .insert("empty".to_string(), ComputeNode::new("empty"));

        let result = BackendRegistry::builtin().build(
            "",
            &options,
            &specs(&["pool:0:2:empty"]),
            &ResourceLimiter::default(),
        );
        assert!(matches!(result, Err(ScalerError::InvalidOptions(_))));
    }
}

mod construction {
    use super::*;

    #[test]
    fn test_groups_keep_bounds_and_order() {
        let backend = build_spotinst(&["poolA:1:5:x", "poolB:0:3:y"]).unwrap();
        let groups = backend.node_groups();

        assert_eq!(groups.len(), 2);
        assert_eq!((groups[0].id(), groups[0].bounds()), ("poolA", (1, 5)));
        assert_eq!((groups[1].id(), groups[1].bounds()), ("poolB", (0, 3)));
        assert_eq!(groups[0].payload(), "x");
    }

    #[test]
    fn test_invalid_spec_names_the_offender() {
        let err = build_spotinst(&["poolC:5:2:z"]).err().unwrap();
        assert!(matches!(&err, ScalerError::Config { spec, .. } if spec.contains("poolC")));
    }

    #[test]
    fn test_construction_is_all_or_nothing() {
        let specs: Vec<PoolSpec> = SpecParser::new().parse_all(&["good:0:1"]).unwrap();
        let manager = InstanceManager::new(Default::default());
        manager.register_groups(specs).unwrap();

        // A later batch mixing a new and an already registered id changes nothing
        let batch = SpecParser::new()
            .parse_all(&["fresh:0:1", "good:0:3"])
            .unwrap();
        assert!(manager.register_groups(batch).is_err());
        let ids: Vec<String> = manager.groups().iter().map(|g| g.id().to_string()).collect();
        assert_eq!(ids, vec!["good"]);

        // A bad spec after good ones fails the whole backend
        assert!(build_spotinst(&["a:0:1", "b:0:2", "c:3:1"]).is_err());
    }

    #[test]
    fn test_label_backend_rejects_scale_to_zero() {
        let result = BackendRegistry::builtin().build(
            LabelBackend::NAME,
            &BackendOptions::default(),
            &specs(&["pool:0:3"]),
            &ResourceLimiter::default(),
        );
        assert!(matches!(result, Err(ScalerError::Config { .. })));
    }

    #[test]
    fn test_limiter_is_exposed() {
        let mut limiter = ResourceLimiter::default();
        limiter.max.insert(GPU_MEMORY.to_string(), Quantity::new(96));

        let backend = BackendRegistry::builtin()
            .build("", &BackendOptions::default(), &specs(&[]), &limiter)
            .unwrap();

        assert_eq!(backend.resource_limiter().max_limit(GPU_MEMORY), Quantity::new(96));
        assert_eq!(backend.resource_limiter().min_limit(GPU_MEMORY), Quantity::ZERO);
        assert_eq!(
            backend.resource_limiter().max_limit("cpu"),
            Quantity::new(u64::MAX)
        );
    }
}

mod lookup {
    use super::*;

    #[test]
    fn test_spotinst_maps_nodes_through_instances() {
        let backend = build_spotinst(&["gpu:0:4"]).unwrap();
        backend.bind_instance("i-0abc", "gpu").unwrap();

        let managed = ComputeNode::new("n1").with_provider_id("aws:///us-east-1a/i-0abc");
        let stray = ComputeNode::new("n2").with_provider_id("aws:///us-east-1a/i-0def");
        let broken = ComputeNode::new("n3");

        assert_eq!(backend.node_group_for_node(&managed).unwrap().unwrap().id(), "gpu");
        assert!(backend.node_group_for_node(&stray).unwrap().is_none());
        assert!(matches!(
            backend.node_group_for_node(&broken),
            Err(ScalerError::InvalidProviderId(_))
        ));
    }

    #[test]
    fn test_owner_lookup_delegates_to_backend() {
        let backend = build_spotinst(&["a:0:1", "b:0:1"]).unwrap();
        backend.bind_instance("i-1", "b").unwrap();
        let a = &backend.node_groups()[0];

        assert_eq!(a.owner_lookup("i-1").unwrap().id(), "b");
        assert!(matches!(
            a.owner_lookup("i-2"),
            Err(ScalerError::InstanceNotFound(_))
        ));
    }

    #[test]
    fn test_binding_to_unknown_group_fails() {
        let backend = build_spotinst(&["a:0:1"]).unwrap();
        assert!(matches!(
            backend.bind_instance("i-1", "missing"),
            Err(ScalerError::Config { .. })
        ));
    }

    #[test]
    fn test_label_backend_maps_nodes_through_label() {
        let backend = BackendRegistry::builtin()
            .build(
                LabelBackend::NAME,
                &BackendOptions::default(),
                &specs(&["workers:1:3"]),
                &ResourceLimiter::default(),
            )
            .unwrap();

        let member = ComputeNode::new("w1").with_label(NODE_GROUP_LABEL, "workers");
        let foreign = ComputeNode::new("w2").with_label(NODE_GROUP_LABEL, "elsewhere");

        assert_eq!(backend.node_group_for_node(&member).unwrap().unwrap().id(), "workers");
        assert!(backend.node_group_for_node(&foreign).unwrap().is_none());
        assert!(backend
            .node_group_for_node(&ComputeNode::new("w3"))
            .unwrap()
            .is_none());
    }
}

mod templates {
    use super::*;

    #[tokio::test]
    async fn test_static_template_from_payload() {
        let backend = BackendRegistry::builtin()
            .build(
                "",
                &catalog(),
                &specs(&["gpu:0:4:g5.xlarge"]),
                &ResourceLimiter::default(),
            )
            .unwrap();

        let template = backend.node_groups()[0].template_node().await.unwrap();

        assert_eq!(template.name, "template-node-for-gpu");
        assert_eq!(template.capacity_of(GPU_MEMORY), Quantity::new(24));
        assert_eq!(template.allocatable_of(GPU_MEMORY), Quantity::new(24));
        assert_eq!(template.labels.get(NODE_GROUP_LABEL).map(String::as_str), Some("gpu"));
    }

    #[tokio::test]
    async fn test_observed_node_becomes_template() {
        let backend = build_spotinst(&["gpu:0:4"]).unwrap();
        let group = Arc::clone(&backend.node_groups()[0]);

        assert!(matches!(
            group.template_node().await,
            Err(ScalerError::TemplateUnavailable { .. })
        ));

        backend.bind_instance("i-7", "gpu").unwrap();
        let live = ComputeNode::new("ip-10-0-0-7")
            .with_provider_id("aws:///us-east-1a/i-7")
            .with_label(HOSTNAME_LABEL, "ip-10-0-0-7")
            .with_capacity(GPU_MEMORY, 16u64);
        let attributed = backend.observe_node(&live).unwrap();
        assert_eq!(attributed.map(|g| g.id().to_string()), Some("gpu".to_string()));

        let template = group.template_node().await.unwrap();
        assert_eq!(template.capacity_of(GPU_MEMORY), Quantity::new(16));
        assert!(template.provider_id.is_empty());
        assert!(!template.labels.contains_key(HOSTNAME_LABEL));
    }

    #[tokio::test]
    async fn test_label_backend_observes_only_labelled_nodes() {
        let backend = BackendRegistry::builtin()
            .build(
                LabelBackend::NAME,
                &BackendOptions::default(),
                &specs(&["gpu:1:4"]),
                &ResourceLimiter::default(),
            )
            .unwrap();
        let group = Arc::clone(&backend.node_groups()[0]);

        let stray = ComputeNode::new("stray").with_capacity(GPU_MEMORY, 8u64);
        assert!(backend.observe_node(&stray).unwrap().is_none());
        assert!(matches!(
            group.template_node().await,
            Err(ScalerError::TemplateUnavailable { .. })
        ));

        let live = ComputeNode::new("live")
            .with_label(NODE_GROUP_LABEL, "gpu")
            .with_capacity(GPU_MEMORY, 16u64);
        let attributed = backend.observe_node(&live).unwrap();
        assert_eq!(attributed.map(|g| g.id().to_string()), Some("gpu".to_string()));

        let template = group.template_node().await.unwrap();
        assert_eq!(template.capacity_of(GPU_MEMORY), Quantity::new(16));
    }

    #[tokio::test]
    async fn test_static_template_takes_precedence() {
        let backend = BackendRegistry::builtin()
            .build(
                "",
                &catalog(),
                &specs(&["gpu:0:4:g5.xlarge"]),
                &ResourceLimiter::default(),
            )
            .unwrap();
        backend.bind_instance("i-9", "gpu").unwrap();
        backend
            .observe_node(
                &ComputeNode::new("live")
                    .with_provider_id("aws:///zone/i-9")
                    .with_capacity(GPU_MEMORY, 8u64),
            )
            .unwrap();

        let template = backend.node_groups()[0].template_node().await.unwrap();
        assert_eq!(template.capacity_of(GPU_MEMORY), Quantity::new(24));
    }

    #[tokio::test]
    async fn test_scale_from_zero_end_to_end() {
        let backend = BackendRegistry::builtin()
            .build(
                "",
                &catalog(),
                &specs(&["gpu:0:4:g5.xlarge", "cpu:1:10"]),
                &ResourceLimiter::default(),
            )
            .unwrap();
        backend.bind_instance("i-new", "gpu").unwrap();
        backend.bind_instance("i-cpu", "cpu").unwrap();
        let estimator = NodeCapacityEstimator::new(GPU_MEMORY, MARKER);

        // Driver still installing: marker present, nothing allocatable yet
        let booting = ComputeNode::new("booting")
            .with_provider_id("aws:///zone/i-new")
            .with_label(MARKER, "a10g");
        let group = backend.node_group_for_node(&booting).unwrap();
        let estimate = estimator
            .node_capacity(&booting, group.as_deref())
            .await
            .unwrap();
        assert_eq!(estimate.quantity, Quantity::new(24));
        assert_eq!(estimate.source, CapacitySource::Template);

        // Marked node in a group with no template
        let odd = ComputeNode::new("odd")
            .with_provider_id("aws:///zone/i-cpu")
            .with_label(MARKER, "t4");
        let group = backend.node_group_for_node(&odd).unwrap();
        let estimate = estimator.node_capacity(&odd, group.as_deref()).await.unwrap();
        assert_eq!(estimate.source, CapacitySource::TemplateUnavailable);

        // Marked node outside every group
        let static_node = ComputeNode::new("static")
            .with_provider_id("aws:///zone/i-unknown")
            .with_label(MARKER, "a10g");
        let group = backend.node_group_for_node(&static_node).unwrap();
        assert!(group.is_none());
        assert!(matches!(
            estimator.node_capacity(&static_node, group.as_deref()).await,
            Err(ScalerError::UnmanagedNode { .. })
        ));
    }
}
