use super::Session;
use crate::config::CliConfig;
use grotto_core::{Address, Role, Scope};

pub fn init(session: &Session, config: &CliConfig) -> anyhow::Result<()> {
    let grotto = session.grotto();
    let granted = grotto.bootstrap(&config.operator);

    println!("Deployment ready");
    println!("  Operator: {}", config.operator);
    println!("  Platform account: {}", grotto.config().platform_account);
    println!("  New grants: {}", granted);
    println!("  Seed commitment: {}", grotto.seed_commitment());
    Ok(())
}

pub fn grant(
    session: &Session,
    sender: &Address,
    role: &str,
    scope: &str,
    address: &str,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let scope: Scope = scope.parse()?;
    let address = Address::from(address);

    let grotto = session.grotto();
    let added = match role {
        Role::Creator => grotto.grant_creator(sender, scope, &address)?,
        Role::Player => grotto.grant_player(sender, scope, &address)?,
        Role::Admin => grotto.grant_admin(sender, scope, &address)?,
    };

    if added {
        println!("Granted {} on {} to {}", role, scope, address);
    } else {
        println!("{} already holds {} on {}", address, role, scope);
    }
    Ok(())
}
