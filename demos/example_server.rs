use std::convert::Infallible;
use std::net::SocketAddr;

use anyhow::Context;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
#[allow(unused_imports)]
use log::{info, warn};

#[cfg(not(feature = "settings"))]
use hyper_accesslog::logger::LoggerConfig;
use hyper_accesslog::logger::{access_log_sink, AccessLogger, RequestRecord, ResponseRecord};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), anyhow::Error> {
    #[cfg(feature = "settings")]
    hyper_accesslog::logger::utils::load_config("demos/config", "dev")?;

    #[cfg(feature = "log_file")]
    hyper_accesslog::logger::utils::setup_logging("demos/config/log4rs.yml")?;

    #[cfg(feature = "settings")]
    let logger = AccessLogger::from_settings(
        access_log_sink(),
        hyper_accesslog::logger::TokenResolvers::new(),
    );

    #[cfg(not(feature = "settings"))]
    let logger = AccessLogger::new(
        LoggerConfig::new(access_log_sink())
            .template(":method :path - :status-code in :duration (:user)")
            .resolver("user", |_req, _res, _duration, _finished| {
                "anonymous".to_string()
            }),
    );

    let addr: SocketAddr = "127.0.0.1:6464"
        .parse()
        .with_context(|| "Error in parsing server addr")?;

    let make_svc = make_service_fn(move |_conn| {
        let logger = logger.clone();

        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let logger = logger.clone();

                async move {
                    let mut lifecycle = logger.track(RequestRecord::new(&req, false));

                    let response = handle(req).await;

                    if let Err(err) = lifecycle.finished(&ResponseRecord::new(&response)) {
                        warn!("Error in writing access log line: {:?}", err);
                    }

                    Ok::<_, Infallible>(response)
                }
            }))
        }
    });

    info!("Starting server at addr: {}", addr);

    Server::bind(&addr)
        .serve(make_svc)
        .await
        .with_context(|| "Error in starting server")
}

async fn handle(req: Request<Body>) -> Response<Body> {
    match req.uri().path() {
        "/health" => Response::new(Body::from("OK")),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("Not found"))
            .unwrap(),
    }
}
