//! AdLib `.BNK` instrument banks and the instrument resolver used while a
//! ROL song loads.

use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::consts::*;
use crate::encoder::Operator;
use crate::error::Error;
use crate::reader::ByteReader;

/// A resolved ROL instrument.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub modulator: Operator,
    pub carrier: Operator,
}

/// One operator as stored in a bank record, one byte per parameter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FmOperator {
    key_scale_level: u8,
    freq_multiplier: u8,
    feedback: u8,
    attack_rate: u8,
    sustain_level: u8,
    sustaining_sound: u8,
    decay_rate: u8,
    release_rate: u8,
    output_level: u8,
    amplitude_vibrato: u8,
    frequency_vibrato: u8,
    envelope_scaling: u8,
    fm_type: u8,
}

impl FmOperator {
    fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        Ok(Self {
            key_scale_level: reader.read_u8()?,
            freq_multiplier: reader.read_u8()?,
            feedback: reader.read_u8()?,
            attack_rate: reader.read_u8()?,
            sustain_level: reader.read_u8()?,
            sustaining_sound: reader.read_u8()?,
            decay_rate: reader.read_u8()?,
            release_rate: reader.read_u8()?,
            output_level: reader.read_u8()?,
            amplitude_vibrato: reader.read_u8()?,
            frequency_vibrato: reader.read_u8()?,
            envelope_scaling: reader.read_u8()?,
            fm_type: reader.read_u8()?,
        })
    }

    /// Pack into register layout.
    fn pack(&self, waveform: u8) -> Operator {
        Operator {
            ammulti: self.amplitude_vibrato << 7
                | self.frequency_vibrato << 6
                | self.sustaining_sound << 5
                | self.envelope_scaling << 4
                | self.freq_multiplier,
            ksltl: self.key_scale_level << 6 | self.output_level,
            ardr: self.attack_rate << 4 | self.decay_rate,
            slrr: self.sustain_level << 4 | self.release_rate,
            fbc: self.feedback << 1 | (self.fm_type ^ 1),
            waveform,
        }
    }
}

/// Entry of the bank's sorted name directory.
#[derive(Debug, Clone)]
struct BankEntry {
    index: u16,
    name: String,
}

/// An instrument bank: a sorted name directory over fixed-size records.
#[derive(Debug)]
pub struct Bank<'a> {
    data: &'a [u8],
    data_offset: usize,
    entries: Vec<BankEntry>,
}

/// Case-insensitive name ordering used by the bank directory.
fn compare_names(left: &str, right: &str) -> Ordering {
    let left = left.bytes().map(|b| b.to_ascii_lowercase());
    let right = right.bytes().map(|b| b.to_ascii_lowercase());

    left.cmp(right)
}

impl<'a> Bank<'a> {
    /// Read the bank header and name directory.
    pub fn from_slice(data: &'a [u8]) -> Result<Self, Error> {
        let mut reader = ByteReader::new(data);

        let major = reader.read_u8()?;
        let minor = reader.read_u8()?;
        let signature = reader.read_str(BNK_SIGNATURE_LENGTH)?;
        let used = reader.read_u16()?;
        let _total = reader.read_u16()?;
        let names_offset = reader.read_i32()?;
        let data_offset = reader.read_i32()?;

        log::debug!(
            "Bank {}.{} {:?}: {} instruments",
            major,
            minor,
            signature,
            used
        );

        if names_offset < 0 || data_offset < 0 {
            return Err(Error::MalformedRecord("negative bank offset"));
        }
        reader.seek(names_offset as usize)?;

        let mut entries = Vec::with_capacity(usize::from(used).min(reader.remaining() / 12));
        for _ in 0..used {
            let index = reader.read_u16()?;
            let _record_used = reader.read_u8()?;
            let name = reader.read_str(ROL_NAME_LENGTH)?;
            entries.push(BankEntry { index, name });
        }

        Ok(Self {
            data,
            data_offset: data_offset as usize,
            entries,
        })
    }

    /// Number of names in the directory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the record index for `name`, ignoring case.
    ///
    /// Returns the first match of the sorted directory.
    pub fn find(&self, name: &str) -> Option<u16> {
        let first = self
            .entries
            .partition_point(|entry| compare_names(&entry.name, name) == Ordering::Less);

        self.entries
            .get(first)
            .filter(|entry| compare_names(&entry.name, name) == Ordering::Equal)
            .map(|entry| entry.index)
    }

    /// Read the instrument stored in record `index`.
    pub fn instrument(&self, index: u16, name: &str) -> Result<Instrument, Error> {
        let mut reader = ByteReader::new(self.data);
        reader.seek(self.data_offset + usize::from(index) * BNK_RECORD_LENGTH)?;

        let _mode = reader.read_u8()?;
        let _voice_number = reader.read_u8()?;
        let modulator = FmOperator::read(&mut reader)?;
        let carrier = FmOperator::read(&mut reader)?;
        let modulator_waveform = reader.read_u8()?;
        let carrier_waveform = reader.read_u8()?;

        Ok(Instrument {
            name: name.into(),
            modulator: modulator.pack(modulator_waveform),
            carrier: carrier.pack(carrier_waveform),
        })
    }
}

/// Maps instrument names to indices into a growing instrument list.
///
/// The same name (in any case) always yields the same index for the whole
/// load. Names the bank does not know resolve to a silent, all-zero
/// instrument.
#[derive(Debug)]
pub(crate) struct Resolver<'a> {
    bank: Bank<'a>,
    instruments: Vec<Instrument>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(bank: Bank<'a>) -> Self {
        Self {
            bank,
            instruments: Vec::new(),
        }
    }

    pub(crate) fn resolve(&mut self, name: &str) -> Result<usize, Error> {
        if let Some(index) = self
            .instruments
            .iter()
            .position(|ins| ins.name.eq_ignore_ascii_case(name))
        {
            return Ok(index);
        }

        let instrument = match self.bank.find(name) {
            Some(record) => self.bank.instrument(record, name)?,
            None => {
                log::debug!("Instrument {:?} not in bank, using defaults", name);
                Instrument {
                    name: name.into(),
                    ..Instrument::default()
                }
            }
        };
        self.instruments.push(instrument);

        Ok(self.instruments.len() - 1)
    }

    pub(crate) fn into_instruments(self) -> Vec<Instrument> {
        self.instruments
    }
}
