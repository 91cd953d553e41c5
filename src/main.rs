use actix_web::HttpServer;
use appfactory::{compose, Settings};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let app = match compose(Settings::from_env()) {
        Ok(app) => app,
        Err(e) => {
            log::error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };
    let (host, port) = match app.settings().bind_address() {
        Ok(address) => address,
        Err(e) => {
            log::error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Starting server at http://{}:{}", host, port);
    HttpServer::new(move || app.service())
        .bind((host, port))?
        .run()
        .await
}
