use std::any::Any;
use std::collections::HashMap;

use encdb_bootstrap::{
    pool::{downcast, downcast_mut},
    Bootstrap, EncDbConfig, FieldAccess, PoolAdapter, PoolHandle, Result,
};
use tracing_subscriber::EnvFilter;

/// Hikari-style pool shape used by the walkthrough.
struct DemoPool {
    driver_class_name: String,
    jdbc_url: String,
    connection_properties: HashMap<String, String>,
}

struct DemoPoolAdapter;

impl PoolAdapter for DemoPoolAdapter {
    fn driver_class(&self, pool: &dyn Any) -> Result<Option<String>> {
        Ok(Some(downcast::<DemoPool>(pool)?.driver_class_name.clone()))
    }

    fn set_driver_class(&self, pool: &mut dyn Any, value: &str) -> Result<FieldAccess> {
        downcast_mut::<DemoPool>(pool)?.driver_class_name = value.to_string();
        Ok(FieldAccess::Applied)
    }

    fn url(&self, pool: &dyn Any) -> Result<Option<String>> {
        Ok(Some(downcast::<DemoPool>(pool)?.jdbc_url.clone()))
    }

    fn set_url(&self, pool: &mut dyn Any, value: &str) -> Result<FieldAccess> {
        downcast_mut::<DemoPool>(pool)?.jdbc_url = value.to_string();
        Ok(FieldAccess::Applied)
    }

    fn set_property(&self, pool: &mut dyn Any, key: &str, value: &str) -> Result<FieldAccess> {
        downcast_mut::<DemoPool>(pool)?
            .connection_properties
            .insert(key.to_string(), value.to_string());
        Ok(FieldAccess::Applied)
    }
}

/// A pool the bootstrap knows nothing about.
struct OpaquePool;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== EncDB Bootstrap Walkthrough ===\n");

    let config_path = std::env::temp_dir().join("encdb-demo").join("encjdbc.conf");
    let config = EncDbConfig {
        enabled: true,
        show_log: true,
        driver_class_name: "com.aliyun.encdb.mysql.jdbc.EncDriver".to_string(),
        config_path: config_path.to_string_lossy().into_owned(),
        ..EncDbConfig::default()
    };

    let bootstrap = Bootstrap::new(config);
    bootstrap.registry().register::<DemoPool>(DemoPoolAdapter);

    let pools = vec![
        PoolHandle::new(
            "orders",
            DemoPool {
                driver_class_name: "com.mysql.cj.jdbc.Driver".to_string(),
                jdbc_url: "jdbc:mysql://localhost:3306/orders?useSSL=false".to_string(),
                connection_properties: HashMap::new(),
            },
        ),
        PoolHandle::new("metrics", OpaquePool),
    ];

    let report = bootstrap.run(&pools);

    println!("[STATE] {:?}", bootstrap.state());
    println!("[SECRET] {:?}", report.secret);
    println!(
        "[FIELDS] patched={} skipped={} failed={}\n",
        report.fields_patched, report.fields_skipped, report.fields_failed
    );

    pools[0].with(|pool| {
        let pool = pool.downcast_ref::<DemoPool>().expect("demo pool type");
        println!("[ORDERS] driver: {}", pool.driver_class_name);
        println!("[ORDERS] url:    {}", pool.jdbc_url);
        println!("[ORDERS] props:  {:?}\n", pool.connection_properties);
    });

    println!(
        "{}",
        serde_json::to_string_pretty(report).expect("report is serializable")
    );
}
