//! CC1101 Driver Tests
//!
//! Register traffic, FIFO bounds, status decoding and synthesizer
//! quantization, against a recording SPI double.

use std::collections::VecDeque;

use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};
use subghz_firmware::drivers::cc1101::{
    reg, status_reg, strobe, Cc1101, ChipState, ChipStatus, FIFO, PATABLE, READ_BURST,
    READ_SINGLE, WRITE_BURST,
};

// ============================================================================
// SPI Double
// ============================================================================

#[derive(Debug)]
struct NoError;

impl embedded_hal::spi::Error for NoError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Records every transaction; plays back scripted responses in order.
#[derive(Default)]
struct SpiMock {
    writes: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
}

impl SpiMock {
    fn with_responses(responses: &[&[u8]]) -> Self {
        Self {
            writes: Vec::new(),
            responses: responses.iter().map(|r| r.to_vec()).collect(),
        }
    }
}

impl ErrorType for SpiMock {
    type Error = NoError;
}

impl SpiDevice for SpiMock {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), NoError> {
        for op in operations {
            if let Operation::TransferInPlace(buf) = op {
                self.writes.push(buf.to_vec());
                if let Some(response) = self.responses.pop_front() {
                    let n = response.len().min(buf.len());
                    buf[..n].copy_from_slice(&response[..n]);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Strobes and Registers
// ============================================================================

#[test]
fn test_strobe_is_single_byte() {
    let mut chip = Cc1101::new(SpiMock::default());
    chip.strobe(strobe::SRX);
    let spi = chip.release();
    assert_eq!(spi.writes, vec![vec![strobe::SRX]]);
}

#[test]
fn test_reset_and_shutdown_strobes() {
    let mut chip = Cc1101::new(SpiMock::default());
    chip.reset();
    chip.shutdown();
    let spi = chip.release();
    assert_eq!(spi.writes, vec![vec![strobe::SRES], vec![strobe::SPWD]]);
}

#[test]
fn test_write_reg_frames_address_and_data() {
    let mut chip = Cc1101::new(SpiMock::default());
    chip.write_reg(reg::PKTLEN, 0x3C);
    let spi = chip.release();
    assert_eq!(spi.writes, vec![vec![reg::PKTLEN, 0x3C]]);
}

#[test]
fn test_read_reg_sets_read_bit() {
    let mut chip = Cc1101::new(SpiMock::with_responses(&[&[0x00, 0xAB]]));
    let value = chip.read_reg(reg::MDMCFG2);
    assert_eq!(value, 0xAB);
    let spi = chip.release();
    assert_eq!(spi.writes[0][0], reg::MDMCFG2 | READ_SINGLE);
}

#[test]
fn test_read_status_reg_uses_burst_bit() {
    let mut chip = Cc1101::new(SpiMock::with_responses(&[&[0x00, 0x14]]));
    let value = chip.read_status_reg(status_reg::MARCSTATE);
    assert_eq!(value, 0x14);
    let spi = chip.release();
    assert_eq!(spi.writes[0][0], status_reg::MARCSTATE | READ_BURST);
}

#[test]
fn test_write_registers_in_table_order() {
    let mut chip = Cc1101::new(SpiMock::default());
    chip.write_registers(&[(reg::IOCFG0, 0x0D), (reg::MDMCFG2, 0x30)]);
    let spi = chip.release();
    assert_eq!(
        spi.writes,
        vec![vec![reg::IOCFG0, 0x0D], vec![reg::MDMCFG2, 0x30]]
    );
}

#[test]
fn test_pa_table_burst() {
    let mut chip = Cc1101::new(SpiMock::default());
    chip.set_pa_table(&[0x00, 0xC0, 0, 0, 0, 0, 0, 0]);
    let spi = chip.release();
    assert_eq!(spi.writes[0][0], PATABLE | WRITE_BURST);
    assert_eq!(spi.writes[0].len(), 9);
    assert_eq!(spi.writes[0][2], 0xC0);
}

// ============================================================================
// Synthesizer Programming
// ============================================================================

#[test]
fn test_set_frequency_programs_freq_registers() {
    let mut chip = Cc1101::new(SpiMock::default());
    chip.set_frequency(433_920_000);
    let spi = chip.release();
    // 433.92 MHz at a 26 MHz crystal: word = 0x10B071
    assert_eq!(spi.writes[0], vec![reg::FREQ2, 0x10]);
    assert_eq!(spi.writes[1], vec![reg::FREQ1, 0xB0]);
    assert_eq!(spi.writes[2], vec![reg::FREQ0, 0x71]);
}

#[test]
fn test_set_frequency_returns_quantized_value() {
    let mut chip = Cc1101::new(SpiMock::default());
    let actual = chip.set_frequency(433_920_000);
    // The synthesizer step is ~397 Hz; the achieved value is below the
    // request and must be what callers use from here on.
    assert_eq!(actual, 433_919_830);
    assert!(433_920_000 - actual < 397);
}

#[test]
fn test_set_frequency_exact_multiple_roundtrips() {
    let mut chip = Cc1101::new(SpiMock::default());
    // 26 MHz << 4 is exactly representable.
    let actual = chip.set_frequency(416_000_000);
    assert_eq!(actual, 416_000_000);
}

// ============================================================================
// FIFO Access
// ============================================================================

#[test]
fn test_write_fifo_burst_header_and_payload() {
    let mut chip = Cc1101::new(SpiMock::default());
    chip.write_fifo(&[1, 2, 3]);
    let spi = chip.release();
    assert_eq!(spi.writes[0], vec![FIFO | WRITE_BURST, 1, 2, 3]);
}

#[test]
fn test_write_fifo_bounded_by_chip_depth() {
    let mut chip = Cc1101::new(SpiMock::default());
    chip.write_fifo(&[0xAA; 100]);
    let spi = chip.release();
    // Header plus at most 64 payload bytes.
    assert_eq!(spi.writes[0].len(), 65);
}

#[test]
fn test_read_fifo_returns_payload() {
    let mut chip = Cc1101::new(SpiMock::with_responses(&[&[0x00, 0xDE, 0xAD, 0xBE]]));
    let mut buf = [0u8; 3];
    chip.read_fifo(&mut buf);
    assert_eq!(buf, [0xDE, 0xAD, 0xBE]);
    let spi = chip.release();
    assert_eq!(spi.writes[0][0], FIFO | READ_BURST);
}

#[test]
fn test_rx_bytes_masks_overflow_bit() {
    let mut chip = Cc1101::new(SpiMock::with_responses(&[&[0x00, 0x83]]));
    assert_eq!(chip.rx_bytes(), 3);
}

// ============================================================================
// Status Decoding
// ============================================================================

#[test]
fn test_status_ready_and_state() {
    let status = ChipStatus(0x1F);
    assert!(status.is_ready());
    assert_eq!(status.state(), ChipState::Rx);
    assert_eq!(status.fifo_bytes(), 15);
}

#[test]
fn test_status_not_ready() {
    let status = ChipStatus(0x80);
    assert!(!status.is_ready());
    assert_eq!(status.state(), ChipState::Idle);
}

#[test]
fn test_status_fifo_error_states() {
    assert_eq!(ChipStatus(0x60).state(), ChipState::RxFifoOverflow);
    assert_eq!(ChipStatus(0x70).state(), ChipState::TxFifoUnderflow);
}

#[test]
fn test_rssi_conversion() {
    let mut chip = Cc1101::new(SpiMock::with_responses(&[&[0x00, 128], &[0x00, 50]]));
    assert!((chip.rssi_dbm() - (-138.0)).abs() < f32::EPSILON);
    assert!((chip.rssi_dbm() - (-49.0)).abs() < f32::EPSILON);
}
