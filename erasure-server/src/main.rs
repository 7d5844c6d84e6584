use erasure_common::db::StoreHandle;
use erasure_common::email::senders::{MockSender, SmtpSender};
use erasure_common::email::EmailSender;

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode};
use std::sync::Arc;

mod env;
mod handlers;
mod middleware;
mod services;

use services::api::RouteLimiters;

const REQUESTS_DIR_NAME: &str = "requests";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut port = 9000u16;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let port_str = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --port option specified but no port was given");
                            std::process::exit(1);
                        }
                    }
                };

                port = {
                    let port_result = port_str.parse::<u16>();

                    match port_result {
                        Ok(p) => p,
                        Err(_) => {
                            eprintln!("ERROR: Incorrect format for port. Integer expected");
                            std::process::exit(1);
                        }
                    }
                };

                continue;
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let base_addr = format!("127.0.0.1:{}", &port);

    let _logger = Logger::try_with_str(&env::CONF.log_level)
        .expect(
            "Invalid log level. Options: ERROR, WARN, INFO, DEBUG, TRACE. \
             Example: `info, my::critical::module=trace`",
        )
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start()
        .expect("Failed to start logger");

    let requests_dir = env::CONF.data_dir.join(REQUESTS_DIR_NAME);
    log::info!("Opening request store at {}...", requests_dir.display());

    let store = match StoreHandle::open_file_store(&requests_dir) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to open request store: {e}");
            eprintln!("ERROR: Failed to open request store at {}", requests_dir.display());
            std::process::exit(1);
        }
    };

    match store.record_count() {
        Ok(count) => log::info!("Request store is ready with {count} stored request(s)"),
        Err(e) => {
            log::error!("Failed to read request store: {e}");
            eprintln!("ERROR: Failed to read request store at {}", requests_dir.display());
            std::process::exit(1);
        }
    }

    let cpu_count = num_cpus::get();
    let actix_workers = env::CONF.actix_worker_count;

    let smtp_thread_pool: EmailSender = if env::CONF.email_enabled {
        log::info!("Connecting to SMTP relay...");

        let max_smtp_connections = env::CONF.max_smtp_connections.unwrap_or(
            (2 * cpu_count)
                .try_into()
                .expect("max_smtp_connections is too large"),
        );

        let smtp_thread_pool = SmtpSender::with_credentials(
            &env::CONF.smtp_username,
            &env::CONF.smtp_password,
            &env::CONF.smtp_address,
            max_smtp_connections,
            env::CONF.smtp_idle_timeout,
        )
        .expect("Failed to connect to SMTP relay");

        match smtp_thread_pool.test_connection().await {
            Ok(true) => (),
            Ok(false) => panic!("Failed to connect to SMTP relay"),
            Err(e) => panic!("Failed to connect to SMTP relay: {e}"),
        }

        log::info!("Successfully connected to SMTP relay");

        Box::new(smtp_thread_pool)
    } else {
        log::info!("Emails are disabled. Using mock email sender.");
        Box::new(MockSender::new())
    };

    let smtp_thread_pool = Data::from(Arc::new(smtp_thread_pool));
    let store = Data::new(store);
    let limiters = RouteLimiters::default();

    log::info!("Listening on {base_addr} with {actix_workers} worker(s)");

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(smtp_thread_pool.clone())
            .configure(|cfg| services::api::configure(cfg, limiters.clone()))
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(actix_workers)
    .bind(base_addr)?
    .run()
    .await?;

    unsafe {
        env::CONF.zeroize();
    }

    Ok(())
}
