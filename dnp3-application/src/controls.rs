//! Control object codecs (group 12 and group 41)

use bytes::{BufMut, BytesMut};
use dnp3_core::{CommandStatus, Dnp3Error, Dnp3Result};
use dnp3_database::{AnalogOutputCommand, AnalogOutputValue, ControlCode, Crob};

/// Encoded size of a CROB
pub const CROB_SIZE: usize = 11;

/// Encoded size of an analog output block by variation
pub const fn analog_output_size(variation: u8) -> Option<usize> {
    match variation {
        1 => Some(5),
        2 => Some(3),
        3 => Some(5),
        4 => Some(9),
        _ => None,
    }
}

fn too_short(what: &str, len: usize) -> Dnp3Error {
    Dnp3Error::InvalidData(format!("{} object too short: {} bytes", what, len))
}

/// Decode a group 12 variation 1 object
pub fn decode_crob(data: &[u8]) -> Dnp3Result<Crob> {
    if data.len() < CROB_SIZE {
        return Err(too_short("CROB", data.len()));
    }
    Ok(Crob {
        code: ControlCode::from_u8(data[0]),
        count: data[1],
        on_time: u32::from_le_bytes([data[2], data[3], data[4], data[5]]),
        off_time: u32::from_le_bytes([data[6], data[7], data[8], data[9]]),
        status: CommandStatus::from_u8(data[10]),
    })
}

/// Encode a group 12 variation 1 object
pub fn encode_crob(crob: &Crob, buf: &mut BytesMut) {
    buf.put_u8(crob.code.to_u8());
    buf.put_u8(crob.count);
    buf.put_u32_le(crob.on_time);
    buf.put_u32_le(crob.off_time);
    buf.put_u8(crob.status.as_u8());
}

/// Decode a group 41 object of the given variation
pub fn decode_analog_output(variation: u8, data: &[u8]) -> Dnp3Result<AnalogOutputCommand> {
    let size = analog_output_size(variation).ok_or_else(|| {
        Dnp3Error::InvalidData(format!("Unsupported analog output variation {}", variation))
    })?;
    if data.len() < size {
        return Err(too_short("Analog output", data.len()));
    }
    let value = match variation {
        1 => AnalogOutputValue::I32(i32::from_le_bytes([data[0], data[1], data[2], data[3]])),
        2 => AnalogOutputValue::I16(i16::from_le_bytes([data[0], data[1]])),
        3 => AnalogOutputValue::F32(f32::from_le_bytes([data[0], data[1], data[2], data[3]])),
        _ => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&data[..8]);
            AnalogOutputValue::F64(f64::from_le_bytes(raw))
        }
    };
    Ok(AnalogOutputCommand {
        value,
        status: CommandStatus::from_u8(data[size - 1]),
    })
}

/// Encode a group 41 object; the variation follows the value type
pub fn encode_analog_output(command: &AnalogOutputCommand, buf: &mut BytesMut) {
    match command.value {
        AnalogOutputValue::I32(v) => buf.put_i32_le(v),
        AnalogOutputValue::I16(v) => buf.put_i16_le(v),
        AnalogOutputValue::F32(v) => buf.put_f32_le(v),
        AnalogOutputValue::F64(v) => buf.put_f64_le(v),
    }
    buf.put_u8(command.status.as_u8());
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnp3_database::OpType;

    #[test]
    fn test_crob_decode() {
        let data = [0x03, 0x01, 0x64, 0, 0, 0, 0xC8, 0, 0, 0, 0x00];
        let crob = decode_crob(&data).unwrap();
        assert_eq!(crob.code.op_type, OpType::LatchOn);
        assert_eq!(crob.on_time, 100);
        assert_eq!(crob.off_time, 200);
        let mut buf = BytesMut::new();
        encode_crob(&crob, &mut buf);
        assert_eq!(buf.as_ref(), &data);
        assert!(decode_crob(&data[..10]).is_err());
    }

    #[test]
    fn test_analog_output_decode() {
        let command = decode_analog_output(2, &[0x10, 0x00, 0x00]).unwrap();
        assert_eq!(command.value, AnalogOutputValue::I16(16));
        assert!(decode_analog_output(4, &[0; 5]).is_err());
        assert!(decode_analog_output(9, &[0; 9]).is_err());
    }
}
