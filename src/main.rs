#[actix_web::main]
async fn main() {
    if let Err(err) = equiview::run().await {
        eprintln!("equiview: {}", err);
        std::process::exit(1);
    }
}
