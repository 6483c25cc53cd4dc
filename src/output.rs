use std::io::Write;

use matchday::{CardStats, RewardCard, SessionState, UsedCardRecord};
use serde::Serialize;

use crate::error::CliError;

fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<(), CliError> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// One `field \t value` line per state field.
pub fn write_state<W: Write>(
    writer: &mut W,
    state: &SessionState,
    json: bool,
) -> Result<(), CliError> {
    if json {
        return write_json(writer, state);
    }

    writeln!(writer, "address\t{}", state.address.as_deref().unwrap_or("-"))?;
    writeln!(writer, "connected\t{}", state.is_connected)?;
    writeln!(writer, "authenticated\t{}", state.is_authenticated)?;
    writeln!(writer, "on_required_network\t{}", state.is_on_required_network)?;
    writer.flush()?;
    Ok(())
}

/// Cards as `id \t rarity \t name` rows, followed by the per-rarity counts.
pub fn write_cards<W: Write>(
    writer: &mut W,
    cards: &[RewardCard],
    stats: Option<CardStats>,
    json: bool,
) -> Result<(), CliError> {
    if json {
        #[derive(Serialize)]
        struct Out<'a> {
            cards: &'a [RewardCard],
            stats: Option<CardStats>,
        }
        return write_json(writer, &Out { cards, stats });
    }

    for card in cards {
        writeln!(writer, "{}\t{}\t{}", card.id, card.rarity, card.name)?;
    }
    if let Some(s) = stats {
        writeln!(
            writer,
            "total={} legendary={} rare={} common={}",
            s.total, s.legendary, s.rare, s.common
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_used<W: Write>(
    writer: &mut W,
    record: Option<&UsedCardRecord>,
    json: bool,
) -> Result<(), CliError> {
    if json {
        return write_json(writer, &record);
    }

    let Some(record) = record else {
        writeln!(writer, "no cards used")?;
        return Ok(());
    };
    for card in &record.cards {
        writeln!(writer, "{}\t{}\t{}\t{}", card.id, card.rarity, card.name, record.timestamp)?;
    }
    writer.flush()?;
    Ok(())
}
