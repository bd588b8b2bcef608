//! # Leaderboard Events
//!
//! Receipt logs and score event parsing.
//! Parses directly from topics and data words, no ABI decoder round trip.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolEvent;

use super::contracts::ILeaderboard;

/// One log entry of a transaction receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Log {
    /// Contract that emitted the log.
    pub address: Address,
    /// Event signature hash followed by indexed parameters.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed parameters.
    pub data: Bytes,
}

/// Outcome of an included transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub tx_hash: B256,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// `false` when execution reverted.
    pub success: bool,
    /// Logs emitted during execution.
    pub logs: Vec<Log>,
}

/// Every leaderboard event the client cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreEvent {
    /// First score recorded for an address.
    NewUserAdded(NewUserAdded),
    /// Existing score overwritten.
    ScoreUpdated(ScoreUpdated),
}

impl ScoreEvent {
    /// Player the event refers to.
    #[must_use]
    pub const fn user(&self) -> Address {
        match self {
            Self::NewUserAdded(added) => added.user,
            Self::ScoreUpdated(updated) => updated.user,
        }
    }

    /// Score stored after the event.
    #[must_use]
    pub const fn score(&self) -> U256 {
        match self {
            Self::NewUserAdded(added) => added.score,
            Self::ScoreUpdated(updated) => updated.new_score,
        }
    }

    /// Encodes the event as the contract at `address` would emit it.
    #[must_use]
    pub fn to_log(&self, address: Address) -> Log {
        match self {
            Self::NewUserAdded(added) => Log {
                address,
                topics: vec![ILeaderboard::NewUserAdded::SIGNATURE_HASH, address_topic(added.user)],
                data: Bytes::from(added.score.to_be_bytes::<32>().to_vec()),
            },
            Self::ScoreUpdated(updated) => {
                let mut data = Vec::with_capacity(64);
                data.extend_from_slice(&updated.new_score.to_be_bytes::<32>());
                data.extend_from_slice(&updated.old_score.to_be_bytes::<32>());
                Log {
                    address,
                    topics: vec![
                        ILeaderboard::ScoreUpdated::SIGNATURE_HASH,
                        address_topic(updated.user),
                    ],
                    data: Bytes::from(data),
                }
            }
        }
    }
}

/// `NewUserAdded` event data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewUserAdded {
    /// The new player.
    pub user: Address,
    /// Their first score.
    pub score: U256,
}

/// `ScoreUpdated` event data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreUpdated {
    /// The player.
    pub user: Address,
    /// Score after the update.
    pub new_score: U256,
    /// Score before the update.
    pub old_score: U256,
}

/// Left-pads an address into an indexed topic word.
fn address_topic(address: Address) -> B256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    B256::from(word)
}

/// Event parser for raw log data.
pub struct EventParser;

impl EventParser {
    /// Parses a `NewUserAdded` event.
    ///
    /// # Arguments
    ///
    /// * `topics` - Event signature + indexed user
    /// * `data` - One word: score
    ///
    /// # Returns
    ///
    /// Parsed event or None if the layout does not match.
    #[must_use]
    pub fn parse_new_user_added(topics: &[B256], data: &[u8]) -> Option<NewUserAdded> {
        if topics.len() < 2 || topics[0] != ILeaderboard::NewUserAdded::SIGNATURE_HASH || data.len() < 32 {
            return None;
        }

        Some(NewUserAdded {
            user: Address::from_slice(&topics[1][12..32]),
            score: U256::from_be_slice(&data[0..32]),
        })
    }

    /// Parses a `ScoreUpdated` event.
    ///
    /// Layout: newScore(32) | oldScore(32)
    #[must_use]
    pub fn parse_score_updated(topics: &[B256], data: &[u8]) -> Option<ScoreUpdated> {
        if topics.len() < 2 || topics[0] != ILeaderboard::ScoreUpdated::SIGNATURE_HASH || data.len() < 64 {
            return None;
        }

        Some(ScoreUpdated {
            user: Address::from_slice(&topics[1][12..32]),
            new_score: U256::from_be_slice(&data[0..32]),
            old_score: U256::from_be_slice(&data[32..64]),
        })
    }

    /// Parses any leaderboard event from a log.
    #[must_use]
    pub fn parse_log(log: &Log) -> Option<ScoreEvent> {
        Self::parse_new_user_added(&log.topics, &log.data)
            .map(ScoreEvent::NewUserAdded)
            .or_else(|| Self::parse_score_updated(&log.topics, &log.data).map(ScoreEvent::ScoreUpdated))
    }

    /// Collects the events the leaderboard at `contract` emitted in a receipt.
    ///
    /// Logs from other contracts and unknown events are skipped.
    #[must_use]
    pub fn parse_receipt(receipt: &TransactionReceipt, contract: Address) -> Vec<ScoreEvent> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address == contract)
            .filter_map(Self::parse_log)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_parser_new_user() {
        let user = Address::repeat_byte(0x11);
        let event = ScoreEvent::NewUserAdded(NewUserAdded { user, score: U256::from(420) });
        let log = event.to_log(Address::repeat_byte(0xAA));

        assert_eq!(log.topics.len(), 2);
        assert_eq!(EventParser::parse_log(&log), Some(event));
    }

    #[test]
    fn test_event_parser_score_updated() {
        let mut data = vec![0u8; 64];
        data[31] = 200; // newScore
        data[63] = 100; // oldScore
        let mut user_topic = [0u8; 32];
        user_topic[12..].copy_from_slice(&[2u8; 20]);
        let topics = [ILeaderboard::ScoreUpdated::SIGNATURE_HASH, B256::from(user_topic)];

        let updated = EventParser::parse_score_updated(&topics, &data).unwrap();

        assert_eq!(updated.user, Address::repeat_byte(2));
        assert_eq!(updated.new_score, U256::from(200));
        assert_eq!(updated.old_score, U256::from(100));
    }

    #[test]
    fn test_event_parser_rejects_foreign_logs() {
        let contract = Address::repeat_byte(0xAA);
        let event = ScoreEvent::NewUserAdded(NewUserAdded {
            user: Address::repeat_byte(1),
            score: U256::from(5),
        });
        let foreign = event.to_log(Address::repeat_byte(0xBB));
        let mut wrong_signature = event.to_log(contract);
        wrong_signature.topics[0] = B256::ZERO;

        let receipt = TransactionReceipt {
            tx_hash: B256::ZERO,
            block_number: 1,
            success: true,
            logs: vec![foreign, wrong_signature, event.to_log(contract)],
        };

        assert_eq!(EventParser::parse_receipt(&receipt, contract), vec![event]);
    }

    #[test]
    fn test_event_parser_short_data() {
        let topics = [ILeaderboard::ScoreUpdated::SIGNATURE_HASH, B256::ZERO];
        assert!(EventParser::parse_score_updated(&topics, &[0u8; 32]).is_none());
    }
}
