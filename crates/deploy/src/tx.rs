//! Legacy (EIP-155) transaction encoding and signing.
//!
//! Avalanche C-Chain and every local devnet accept legacy transactions, and a
//! fixed gas price is what the network profiles configure, so the typed
//! EIP-1559 envelope is not needed.

use alloy_core::{
    primitives::{Address, B256, Bytes, U256, keccak256},
    rlp::{BufMut, EMPTY_STRING_CODE, Encodable, Header},
};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;

/// An unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTx {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

impl LegacyTx {
    fn fields_len(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.map_or(1, |to| to.length())
            + self.value.length()
            + self.input.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        match self.to {
            Some(to) => to.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
        self.value.encode(out);
        self.input.encode(out);
    }

    /// RLP payload hashed for signing: the fields followed by `chain_id, 0, 0`.
    pub fn signing_payload(&self) -> Vec<u8> {
        let payload_length = self.fields_len() + self.chain_id.length() + 2 * 0u8.length();

        let mut out = Vec::with_capacity(payload_length + 3);
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        self.encode_fields(&mut out);
        self.chain_id.encode(&mut out);
        0u8.encode(&mut out);
        0u8.encode(&mut out);
        out
    }

    pub fn signature_hash(&self) -> B256 {
        keccak256(self.signing_payload())
    }

    /// Sign and return the raw transaction bytes with its hash.
    pub fn sign(&self, signer: &PrivateKeySigner) -> Result<SignedTx, alloy_signer::Error> {
        let signature = signer.sign_hash_sync(&self.signature_hash())?;

        let v = self.chain_id * 2 + 35 + u64::from(signature.v());
        let r = signature.r();
        let s = signature.s();

        let payload_length = self.fields_len() + v.length() + r.length() + s.length();
        let mut raw = Vec::with_capacity(payload_length + 3);
        Header {
            list: true,
            payload_length,
        }
        .encode(&mut raw);
        self.encode_fields(&mut raw);
        v.encode(&mut raw);
        r.encode(&mut raw);
        s.encode(&mut raw);

        Ok(SignedTx {
            hash: keccak256(&raw),
            raw: raw.into(),
        })
    }
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub hash: B256,
    pub raw: Bytes,
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::{address, b256, hex};

    use super::*;

    /// Example transaction from EIP-155.
    fn eip155_example() -> LegacyTx {
        LegacyTx {
            chain_id: 1,
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Some(address!("0x3535353535353535353535353535353535353535")),
            value: U256::from(1_000_000_000_000_000_000u64),
            input: Bytes::new(),
        }
    }

    #[test]
    fn test_signing_payload_matches_eip155() {
        let tx = eip155_example();

        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            tx.signature_hash(),
            b256!("0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53")
        );
    }

    #[test]
    fn test_signature_recovers_sender() {
        let signer: PrivateKeySigner =
            "0x4646464646464646464646464646464646464646464646464646464646464646"
                .parse()
                .unwrap();
        let tx = eip155_example();

        let signed = tx.sign(&signer).unwrap();
        let signature = signer.sign_hash_sync(&tx.signature_hash()).unwrap();

        assert_eq!(
            signature
                .recover_address_from_prehash(&tx.signature_hash())
                .unwrap(),
            signer.address()
        );
        // 0xf86c list header, then the fields up to `v` are identical to the payload.
        assert_eq!(signed.raw[0], 0xf8);
        assert_eq!(signed.raw[1] as usize, signed.raw.len() - 2);
        let v = signed.raw[2 + 41];
        assert!(v == 37 || v == 38, "unexpected v {v}");
        assert_eq!(signed.hash, keccak256(&signed.raw));
    }

    #[test]
    fn test_contract_creation_encodes_empty_recipient() {
        let tx = LegacyTx {
            to: None,
            input: Bytes::from_static(&[0x60, 0x80]),
            ..eip155_example()
        };

        let payload = tx.signing_payload();
        // nonce, gas price and gas limit take 1 + 6 + 3 bytes after the list header.
        assert_eq!(payload[1 + 10], EMPTY_STRING_CODE);
    }
}
