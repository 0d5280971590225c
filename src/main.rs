use async_workpool::{
    logging::{self, LogConfig},
    TaskContext, WorkerPoolInner,
};
use tokio::runtime::Builder;
use std::time::Instant;


fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(LogConfig::default().with_env_overrides());

    let rt = Builder::new_multi_thread()
    .worker_threads(num_cpus::get())
    .enable_all()
    .build()?;

    rt.block_on(async {
        let now = Instant::now();
        let pool = WorkerPoolInner::new(num_cpus::get())?;
        for i in 0..100_000 {
            pool.go(TaskContext::background(), move || {
                let _a = i;
            });
        }
        pool.join_all().await;
        println!("elapsed: {:?}", now.elapsed());
        println!("metrics: {:?}", pool.metrics());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
