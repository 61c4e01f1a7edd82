//! Conversion between the JSON instruction records returned by routing and
//! lending services and executable [`Instruction`]s.
//!
//! Wire records are nullable field by field. They are validated eagerly here
//! so that nothing downstream ever sees a partially populated instruction.

use std::str::FromStr;

use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use base64::prelude::{Engine, BASE64_STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Account entry of a [`WireInstruction`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAccount {
  pub pubkey: Option<String>,
  pub is_signer: Option<bool>,
  pub is_writable: Option<bool>,
}

/// Instruction as serialized by external services: base58 program id,
/// ordered account list, base64 payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInstruction {
  pub program_id: Option<String>,
  pub accounts: Option<Vec<WireAccount>>,
  pub data: Option<String>,
}

fn parse_address(
  value: Option<&str>,
  field: &str,
) -> Result<Pubkey, CoreError> {
  let value =
    value.ok_or_else(|| CoreError::malformed(format!("{field} missing")))?;
  Pubkey::from_str(value)
    .map_err(|e| CoreError::malformed(format!("{field} {value:?}: {e}")))
}

fn decode_account(
  index: usize,
  account: &WireAccount,
) -> Result<AccountMeta, CoreError> {
  let pubkey =
    parse_address(account.pubkey.as_deref(), &format!("accounts[{index}]"))?;
  let is_signer = account.is_signer.ok_or_else(|| {
    CoreError::malformed(format!("accounts[{index}].isSigner missing"))
  })?;
  let is_writable = account.is_writable.ok_or_else(|| {
    CoreError::malformed(format!("accounts[{index}].isWritable missing"))
  })?;
  Ok(AccountMeta {
    pubkey,
    is_signer,
    is_writable,
  })
}

/// Decodes a single wire instruction.
///
/// # Errors
/// * Program id missing or not a valid address
/// * Account entry missing a field or carrying an invalid address
/// * Payload missing or not valid base64
pub fn decode(wire: &WireInstruction) -> Result<Instruction, CoreError> {
  let program_id = parse_address(wire.program_id.as_deref(), "programId")?;
  let accounts = wire
    .accounts
    .as_ref()
    .ok_or_else(|| CoreError::malformed("accounts missing"))?
    .iter()
    .enumerate()
    .map(|(index, account)| decode_account(index, account))
    .collect::<Result<Vec<_>, _>>()?;
  let data = wire
    .data
    .as_deref()
    .ok_or_else(|| CoreError::malformed("data missing"))?;
  let data = BASE64_STANDARD
    .decode(data)
    .map_err(|e| CoreError::malformed(format!("data is not base64: {e}")))?;
  Ok(Instruction {
    program_id,
    accounts,
    data,
  })
}

/// Decodes a list of wire instructions, failing on the first malformed one.
///
/// # Errors
/// * Any entry fails [`decode`]; the message names its index
pub fn decode_all(
  wires: &[WireInstruction],
) -> Result<Vec<Instruction>, CoreError> {
  wires
    .iter()
    .enumerate()
    .map(|(index, wire)| {
      decode(wire).map_err(|e| match e {
        CoreError::MalformedInstruction(reason) => {
          CoreError::malformed(format!("instruction {index}: {reason}"))
        }
        other => other,
      })
    })
    .collect()
}

/// Encodes an instruction into its wire form. Inverse of [`decode`].
#[must_use]
pub fn encode(instruction: &Instruction) -> WireInstruction {
  WireInstruction {
    program_id: Some(instruction.program_id.to_string()),
    accounts: Some(
      instruction
        .accounts
        .iter()
        .map(|meta| WireAccount {
          pubkey: Some(meta.pubkey.to_string()),
          is_signer: Some(meta.is_signer),
          is_writable: Some(meta.is_writable),
        })
        .collect(),
    ),
    data: Some(BASE64_STANDARD.encode(&instruction.data)),
  }
}
