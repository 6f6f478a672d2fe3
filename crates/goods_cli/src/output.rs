//! Human-readable rendering of command reports.

use std::io::{self, Write};

use crate::commands::{Report, TxRef};

pub fn render(report: &Report, out: &mut impl Write) -> io::Result<()> {
    match report {
        Report::Transaction {
            method,
            contract_id,
            tx,
            value,
        } => {
            writeln!(out, "Called {contract_id}.{method}")?;
            write_tx(out, "Transaction", tx)?;
            if !value.is_null() {
                writeln!(out, "Result:")?;
                write_json(out, value)?;
            }
        }
        Report::Deployment {
            contract_id,
            code_size,
            deploy,
            init,
        } => {
            writeln!(out, "Deployed {code_size} bytes to {contract_id}")?;
            write_tx(out, "Deploy", deploy)?;
            match init {
                Some(tx) => write_tx(out, "Init", tx)?,
                None => writeln!(out, "Init:        skipped (code upgrade)")?,
            }
        }
        Report::AccountCreated {
            account_id,
            public_key,
            key_path,
            tx,
        } => {
            writeln!(out, "Created account {account_id}")?;
            writeln!(out, "Public key:  {public_key}")?;
            writeln!(out, "Key file:    {}", key_path.display())?;
            write_tx(out, "Transaction", tx)?;
        }
        Report::AccountDeleted {
            account_id,
            beneficiary_id,
            tx,
        } => {
            writeln!(out, "Deleted account {account_id}, balance sent to {beneficiary_id}")?;
            writeln!(out, "The local key file was kept.")?;
            write_tx(out, "Transaction", tx)?;
        }
        Report::View {
            contract_id,
            method,
            value,
        } => {
            writeln!(out, "{contract_id}.{method}:")?;
            write_json(out, value)?;
        }
        Report::KeyRemoved {
            account_id,
            removed,
        } => {
            if *removed {
                writeln!(out, "Removed local key for {account_id}")?;
            } else {
                writeln!(out, "No local key for {account_id}")?;
            }
        }
        Report::Keys {
            network,
            dir,
            accounts,
        } => {
            writeln!(out, "Keys for {} in {}", network.label(), dir.display())?;
            if accounts.is_empty() {
                writeln!(out, "  (none)")?;
            }
            for account in accounts {
                writeln!(out, "  {account}")?;
            }
        }
        Report::Networks(profiles) => {
            writeln!(out, "{:<10} {:<45} EXPLORER", "NETWORK", "RPC")?;
            for profile in profiles {
                let rpc = if profile.is_custom_rpc {
                    format!("{} (custom)", profile.rpc_url)
                } else {
                    profile.rpc_url.clone()
                };
                writeln!(out, "{:<10} {:<45} {}", profile.id(), rpc, profile.explorer_url)?;
            }
        }
    }
    Ok(())
}

fn write_tx(out: &mut impl Write, label: &str, tx: &TxRef) -> io::Result<()> {
    writeln!(out, "{:<12} {}", format!("{label}:"), tx.hash)?;
    writeln!(out, "{:<12} {}", "", tx.url)
}

fn write_json(out: &mut impl Write, value: &serde_json::Value) -> io::Result<()> {
    let pretty = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(out, "{pretty}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use goods_chain::{AccountId, Network, NetworkProfile};
    use goods_core::GoodsConfig;
    use std::path::PathBuf;

    fn account(id: &str) -> AccountId {
        id.parse().unwrap()
    }

    fn rendered(report: &Report) -> String {
        let mut buf = Vec::new();
        render(report, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn tx(hash: &str) -> TxRef {
        TxRef {
            hash: hash.into(),
            url: format!("https://testnet.nearblocks.io/txns/{hash}"),
        }
    }

    #[test]
    fn deployment_lists_both_transactions() {
        let text = rendered(&Report::Deployment {
            contract_id: account("rocks.testnet"),
            code_size: 1024,
            deploy: tx("D1"),
            init: Some(tx("I1")),
        });
        assert!(text.contains("Deployed 1024 bytes to rocks.testnet"));
        assert!(text.contains("D1"));
        assert!(text.contains("https://testnet.nearblocks.io/txns/I1"));
    }

    #[test]
    fn upgrade_says_init_was_skipped() {
        let text = rendered(&Report::Deployment {
            contract_id: account("rocks.testnet"),
            code_size: 1,
            deploy: tx("D1"),
            init: None,
        });
        assert!(text.contains("skipped"));
    }

    #[test]
    fn view_pretty_prints_value() {
        let text = rendered(&Report::View {
            contract_id: account("rocks.testnet"),
            method: "get_admin".into(),
            value: serde_json::json!({"admin": "alice.testnet"}),
        });
        assert!(text.starts_with("rocks.testnet.get_admin:"));
        assert!(text.contains("\"admin\": \"alice.testnet\""));
    }

    #[test]
    fn null_call_result_is_omitted() {
        let text = rendered(&Report::Transaction {
            method: "change_admin".into(),
            contract_id: account("rocks.testnet"),
            tx: tx("T1"),
            value: serde_json::Value::Null,
        });
        assert!(!text.contains("Result:"));
    }

    #[test]
    fn created_account_shows_key_file() {
        let text = rendered(&Report::AccountCreated {
            account_id: account("demo.testnet"),
            public_key: "ed25519:abc".into(),
            key_path: PathBuf::from("/keys/testnet/demo.testnet.json"),
            tx: tx("C1"),
        });
        assert!(text.contains("ed25519:abc"));
        assert!(text.contains("/keys/testnet/demo.testnet.json"));
    }

    #[test]
    fn empty_key_list_says_none() {
        let text = rendered(&Report::Keys {
            network: Network::Testnet,
            dir: PathBuf::from("/keys/testnet"),
            accounts: vec![],
        });
        assert!(text.contains("(none)"));
    }

    #[test]
    fn networks_table_marks_custom_rpc() {
        let mut config = GoodsConfig::default();
        config
            .set_rpc_override("testnet", "http://localhost:3030".into())
            .unwrap();
        let profiles = vec![NetworkProfile::lookup("testnet", &config).unwrap()];
        let text = rendered(&Report::Networks(profiles));
        assert!(text.contains("http://localhost:3030 (custom)"));
    }
}
