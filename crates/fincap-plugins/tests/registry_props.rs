//! Aggregate counts stay consistent across arbitrary lifecycle sequences.

mod common;

use std::collections::BTreeMap;

use common::{echo_catalog, market_server, registry_with};
use fincap_plugins::PluginStatus;
use proptest::prelude::*;

/// Plugin names and the tool count each yields when active. `ghost` is not
/// resolvable and always loads as an error record.
const PLUGINS: [(&str, Option<usize>); 3] = [
    ("echo", Some(1)),
    ("market_data_adapter", Some(2)),
    ("ghost", None),
];

#[derive(Debug, Clone, Copy)]
enum Op {
    Load(usize),
    Unload(usize),
    Reload(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let index = 0..PLUGINS.len();
    prop_oneof![
        index.clone().prop_map(Op::Load),
        index.clone().prop_map(Op::Unload),
        index.prop_map(Op::Reload),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn total_tools_matches_active_records(ops in prop::collection::vec(op(), 1..24)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let registry = registry_with(&market_server(), echo_catalog()).await;
            // name -> Some(tools) when active, None when an error record.
            let mut model: BTreeMap<&str, Option<usize>> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Load(i) | Op::Reload(i) => {
                        let (name, tools) = PLUGINS[i];
                        let loaded = match op {
                            Op::Load(_) => registry.load(name).await,
                            _ => registry.reload(name).await,
                        };
                        prop_assert_eq!(loaded, tools.is_some());
                        model.insert(name, tools);
                    },
                    Op::Unload(i) => {
                        let (name, _) = PLUGINS[i];
                        let removed = registry.unload(name).await;
                        prop_assert_eq!(removed, model.remove(name).is_some());
                    },
                }

                let stats = registry.stats().await;
                let expected_tools: usize = model.values().flatten().sum();
                let active = model.values().filter(|t| t.is_some()).count();
                prop_assert_eq!(stats.total, model.len());
                prop_assert_eq!(stats.active, active);
                prop_assert_eq!(stats.error, model.len().saturating_sub(active));
                prop_assert_eq!(stats.total_tools, expected_tools);
                prop_assert_eq!(registry.available_tools(None).await.len(), expected_tools);
                prop_assert_eq!(stats.per_category_counts.values().sum::<usize>(), expected_tools);

                for record in registry.records().await {
                    if record.status == PluginStatus::Active {
                        prop_assert_eq!(record.tools_count(), record.tools.len());
                    } else {
                        prop_assert!(record.tools.is_empty());
                    }
                }
            }
            Ok(())
        })?;
    }
}
