#![forbid(unsafe_code)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pacer::{
    AuthenticationStrategy, BatchSizeConfig, BatchSizeController, BoxError, ConnectionPool,
    ConnectionPoolRegistry, Credential, DatasourceSpec, Identity, PoolConfig, PoolSettings,
};

const ROUNDS: u64 = 256;

fn batch_controller(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch/controller");
    let config = BatchSizeConfig::adaptive(100 * 1024 * 1024, 50);
    for bytes_per_object in [64i64, 4096, 1 << 20] {
        group.throughput(Throughput::Elements(ROUNDS));
        group.bench_with_input(
            BenchmarkId::new("next", bytes_per_object),
            &bytes_per_object,
            |b, &bytes_per_object| {
                let mut controller = BatchSizeController::new();
                b.iter(|| {
                    let mut size = controller.initial();
                    for _ in 0..ROUNDS {
                        size = controller.next(&config, size.saturating_mul(bytes_per_object));
                    }
                    black_box(size)
                });
            },
        );
    }
    group.finish();
}

struct NullPool;

impl ConnectionPool for NullPool {
    type Connection = ();
}

struct NullStrategy;

impl AuthenticationStrategy<NullPool> for NullStrategy {
    fn id(&self) -> &str {
        "kerberos"
    }

    fn resolve_principal(&self, identity: &Identity) -> Option<String> {
        identity.kerberos_user().map(str::to_string)
    }

    fn build_pool(
        &self,
        _datasource: &DatasourceSpec,
        _identity: &Identity,
        _settings: &PoolSettings,
    ) -> Result<NullPool, BoxError> {
        Ok(NullPool)
    }

    fn get_connection(&self, _pool: &NullPool, _identity: &Identity) -> Result<(), BoxError> {
        Ok(())
    }
}

fn registry_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool/registry");
    let registry = ConnectionPoolRegistry::new(PoolConfig::default());
    let datasource = DatasourceSpec::new("postgres", "db.internal", 5432, "sales");
    let identity = Identity::new("alice").with_credential(Credential::Kerberos {
        principal: "alice@CORP.EXAMPLE".into(),
    });
    registry
        .acquire(&datasource, &NullStrategy, &identity)
        .expect("warm pool");
    group.throughput(Throughput::Elements(1));
    group.bench_function("acquire_existing", |b| {
        b.iter(|| {
            registry
                .acquire(&datasource, &NullStrategy, &identity)
                .expect("acquire")
        });
    });
    group.finish();
}

criterion_group!(benches, batch_controller, registry_acquire);
criterion_main!(benches);
