use postlite::{Config, Result, Session};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let mut session = Session::connect(config)?;

    println!("startup response");
    for message in session.startup()? {
        println!("  {message:?}");
    }

    println!("query response");
    for message in session.query("SELECT version()")? {
        println!("  {message:?}");
    }

    session.terminate()?;
    println!("done");

    Ok(())
}
