use super::Session;
use comfy_table::{presets::UTF8_FULL, Table};
use grotto_core::Address;
use grotto_engine::Settlement;

pub fn end(session: &Session, sender: &Address, id: u64) -> anyhow::Result<()> {
    let settlement = session.grotto().end(sender, id)?;
    print_settlement(&settlement);
    Ok(())
}

pub fn force_end(session: &Session, sender: &Address, id: u64) -> anyhow::Result<()> {
    let settlement = session.grotto().force_end(sender, id)?;
    print_settlement(&settlement);
    Ok(())
}

pub fn find_winner(session: &Session, sender: &Address, id: u64) -> anyhow::Result<()> {
    let settlement = session.grotto().find_winner(sender, id)?;
    print_settlement(&settlement);
    Ok(())
}

pub fn claim(session: &Session, sender: &Address, id: u64) -> anyhow::Result<()> {
    let amount = session.grotto().claim(sender, id)?;
    println!("{} claimed {} from wager {}", sender, amount, id);
    Ok(())
}

pub fn claim_creator(session: &Session, sender: &Address, id: u64) -> anyhow::Result<()> {
    let amount = session.grotto().claim_creator(sender, id)?;
    println!("Creator {} claimed {} from wager {}", sender, amount, id);
    Ok(())
}

pub fn claim_platform(session: &Session, sender: &Address, id: u64) -> anyhow::Result<()> {
    let amount = session.grotto().claim_platform(sender, id)?;
    println!(
        "Platform share {} of wager {} credited to {}",
        amount,
        id,
        session.grotto().config().platform_account
    );
    Ok(())
}

pub fn withdraw(session: &Session, sender: &Address) -> anyhow::Result<()> {
    let amount = session.grotto().withdraw(sender)?;
    println!("{} withdrew {}", sender, amount);
    Ok(())
}

fn print_settlement(settlement: &Settlement) {
    println!(
        "Wager {} settled (policy v{})",
        settlement.id, settlement.policy_version
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Party", "Amount"]);
    for winner in &settlement.winners {
        table.add_row(vec![
            format!("winner {}", winner),
            settlement.per_winner.to_string(),
        ]);
    }
    table.add_row(vec![
        "creator".to_string(),
        settlement.creator_shares.to_string(),
    ]);
    table.add_row(vec![
        "platform".to_string(),
        settlement.platform_shares.to_string(),
    ]);
    println!("{}", table);

    if !settlement.remainder.is_zero() {
        println!("  Rounding remainder to creator: {}", settlement.remainder);
    }
}
