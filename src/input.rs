use coinflip_client::session::{
    BET_PRESETS,
    CoinSide,
};

pub const HELP: &str = "\
Commands:
  heads | tails              choose a side
  bet <amount>               set the stake
  preset <1-4>               stake 5 / 10 / 25 / 50
  flip                       flip the coin
  deposit <amount>           request deposit instructions
  withdraw <amount> <addr>   request a withdrawal
  profile                    show balance and statistics
  refresh                    re-fetch balance from the server
  help                       show this help
  quit                       exit";

#[derive(Clone, Debug, PartialEq)]
pub enum UserEvent {
    Quit,
    Help,
    SelectSide(CoinSide),
    SetBet(f64),
    Flip,
    Deposit { amount: String },
    Withdraw { amount: String, address: String },
    Profile,
    Refresh,
}

/// Turns one input line into an event. Empty lines yield `None`.
pub fn interpret_line(line: &str) -> Result<Option<UserEvent>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let event = match command.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => UserEvent::Quit,
        "help" | "?" => UserEvent::Help,
        "heads" | "tails" | "h" | "t" => UserEvent::SelectSide(command.parse()?),
        "bet" => {
            let raw = rest.first().ok_or("bet requires an amount")?;
            let amount = raw
                .parse::<f64>()
                .map_err(|_| format!("not a number: {raw}"))?;
            UserEvent::SetBet(amount)
        }
        "preset" => {
            let raw = rest.first().ok_or("preset requires 1-4")?;
            let amount = raw
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|index| BET_PRESETS.get(index))
                .ok_or_else(|| format!("no preset {raw}; choose 1-4"))?;
            UserEvent::SetBet(*amount)
        }
        "flip" => UserEvent::Flip,
        // Blank fields are passed through so the validator can report them.
        "deposit" => UserEvent::Deposit {
            amount: rest.first().copied().unwrap_or_default().to_string(),
        },
        "withdraw" => UserEvent::Withdraw {
            amount: rest.first().copied().unwrap_or_default().to_string(),
            address: rest.get(1).copied().unwrap_or_default().to_string(),
        },
        "profile" | "balance" => UserEvent::Profile,
        "refresh" => UserEvent::Refresh,
        other => return Err(format!("unknown command: {other} (try help)")),
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn interpret_line__reads_sides_and_stakes() {
        assert_eq!(
            Ok(Some(UserEvent::SelectSide(CoinSide::Heads))),
            interpret_line("heads")
        );
        assert_eq!(Ok(Some(UserEvent::SetBet(12.5))), interpret_line("bet 12.5"));
        assert_eq!(Ok(Some(UserEvent::SetBet(25.0))), interpret_line("preset 3"));
        assert_eq!(Ok(None), interpret_line("   "));
    }

    #[test]
    fn interpret_line__keeps_missing_withdrawal_fields_blank() {
        assert_eq!(
            Ok(Some(UserEvent::Withdraw {
                amount: "10".to_string(),
                address: String::new(),
            })),
            interpret_line("withdraw 10")
        );
    }

    #[test]
    fn interpret_line__rejects_unknown_input() {
        assert!(interpret_line("preset 9").is_err());
        assert!(interpret_line("bet lots").is_err());
        assert!(interpret_line("dance").is_err());
    }
}
