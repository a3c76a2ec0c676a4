mod common;

mod tests {
    use std::time::Instant;

    use dcc_light_decoder::config::{CV_LIGHT_BRIGHTNESS, DecoderConfig, LightCvMap};
    use dcc_light_decoder::renderer::blend_levels;
    use dcc_light_decoder::{
        ConfigError, CvDefinition, Decoder, DecoderEvent, DecoderEvents, Error, EventQueue,
        FactoryReset, FunctionGroup, LightChannel, LightOutput, LuminanceTable, gamma_cool,
        gamma_warm,
    };

    use crate::common::{RecordingDriver, RecordingStorage};

    type TestDecoder = Decoder<RecordingStorage, RecordingDriver>;

    fn decoder_with(storage: RecordingStorage) -> TestDecoder {
        Decoder::new(&DecoderConfig::interior_light(), storage, RecordingDriver::default()).unwrap()
    }

    fn programmed() -> TestDecoder {
        decoder_with(RecordingStorage::programmed())
    }

    fn driven(decoder: &TestDecoder) -> LightOutput {
        let driver = decoder.output_driver();
        LightOutput::new(
            driver.duty(LightChannel::WarmWhite).unwrap(),
            driver.duty(LightChannel::CoolWhite).unwrap(),
        )
    }

    #[test]
    fn test_startup_renders_off_without_function() {
        let decoder = programmed();
        assert_eq!(decoder.output(), LightOutput::OFF);
        assert_eq!(driven(&decoder), LightOutput::OFF);
        assert_eq!(decoder.storage().write_count(), 0);
    }

    #[test]
    fn test_startup_restores_last_state() {
        let mut storage = RecordingStorage::programmed();
        storage.bytes[7] = 200;
        storage.bytes[8] = 100;
        storage.bytes[251] = 0x01;
        let decoder = decoder_with(storage);
        assert!(decoder.is_function_active(1));
        assert_eq!(driven(&decoder), LightOutput::new(50, 17));
    }

    #[test]
    fn test_into_parts_returns_collaborators() {
        let mut decoder = programmed();
        decoder.cv_write(19, 12).unwrap();
        let (storage, driver) = decoder.into_parts();
        assert_eq!(storage.bytes[5], 12);
        assert_eq!(driver.history.len(), 4);
    }

    #[test]
    fn test_blend_levels() {
        assert_eq!(blend_levels(50, 255), (0, 49));
        assert_eq!(blend_levels(50, 0), (49, 0));
        assert_eq!(blend_levels(255, 255), (0, 254));
        assert_eq!(blend_levels(0, 128), (0, 0));
    }

    #[test]
    fn test_primary_full_cool() {
        let mut decoder = programmed();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(gamma_warm(0), gamma_cool(50)));
        assert_eq!(driven(&decoder), LightOutput::new(0, 7));
    }

    #[test]
    fn test_controlling_function_inactive() {
        let mut decoder = programmed();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x1E).unwrap();
        assert!(!decoder.is_function_active(1));
        assert_eq!(decoder.output(), LightOutput::OFF);
        decoder.cv_write(CV_LIGHT_BRIGHTNESS, 255).unwrap();
        assert_eq!(driven(&decoder), LightOutput::OFF);
    }

    #[test]
    fn test_secondary_set_wins_when_active() {
        let mut decoder = programmed();
        decoder.cv_write(1003, 200).unwrap();
        decoder.cv_write(1004, 100).unwrap();
        decoder.cv_write(1005, 3).unwrap();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(0, 7));

        decoder.function_group_changed(FunctionGroup::F0To4, 0x05).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(50, 17));
    }

    #[test]
    fn test_secondary_set_unused() {
        let mut decoder = programmed();
        decoder.cv_write(1003, 200).unwrap();
        decoder.cv_write(1005, 255).unwrap();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x1F).unwrap();
        decoder.function_group_changed(FunctionGroup::F21To28, 0xFF).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(0, 7));
    }

    #[test]
    fn test_secondary_default_selector_is_f20() {
        let mut decoder = programmed();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        decoder.function_group_changed(FunctionGroup::F13To20, 0x80).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(0, gamma_cool(29)));
    }

    #[test]
    fn test_light_test_mode_outputs_raw_values() {
        let mut decoder = programmed();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        decoder.cv_write(1010, 1).unwrap();
        assert_eq!(driven(&decoder), LightOutput::new(50, 255));

        decoder.function_group_changed(FunctionGroup::F0To4, 0x00).unwrap();
        assert_eq!(driven(&decoder), LightOutput::OFF);
    }

    #[test]
    fn test_light_test_mode_compares_against_default() {
        let table = [
            CvDefinition::new(50, 100),
            CvDefinition::new(51, 128),
            CvDefinition::new(52, 1),
            CvDefinition::new(60, 1),
        ];
        let config = DecoderConfig {
            cvs: &table,
            light: LightCvMap {
                brightness: 50,
                color_temperature: 51,
                function_control: 52,
                secondary: None,
                test_mode: Some(60),
            },
            auto_factory_default: false,
            ..DecoderConfig::interior_light()
        };
        let mut storage = RecordingStorage::filled(0);
        storage.bytes[..4].copy_from_slice(&[100, 128, 1, 1]);
        storage.bytes[251] = 0x01;
        let mut decoder: TestDecoder =
            Decoder::new(&config, storage, RecordingDriver::default()).unwrap();

        let (warm, cool) = blend_levels(100, 128);
        assert_eq!((warm, cool), (49, 50));
        assert_eq!(decoder.output(), LightOutput::new(gamma_warm(warm), gamma_cool(cool)));

        decoder.cv_write(60, 0).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(100, 128));

        decoder.cv_write(60, 1).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(gamma_warm(warm), gamma_cool(cool)));
    }

    #[test]
    fn test_unchanged_function_group_is_noop() {
        let mut decoder = programmed();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        let writes = decoder.storage().write_count();
        let renders = decoder.output_driver().history.len();

        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        assert_eq!(decoder.storage().write_count(), writes);
        assert_eq!(decoder.output_driver().history.len(), renders);
    }

    #[test]
    fn test_cv_write_same_value_is_noop() {
        let mut decoder = programmed();
        assert_eq!(decoder.cv_write(1000, 80), Ok(80));
        let renders = decoder.output_driver().history.len();
        assert_eq!(decoder.cv_write(1000, 80), Ok(80));
        assert_eq!(decoder.storage().write_count(), 1);
        assert_eq!(decoder.output_driver().history.len(), renders);
    }

    #[test]
    fn test_cv_requests() {
        let mut decoder = programmed();
        assert!(decoder.cv_valid(29, true));
        assert!(!decoder.cv_valid(8, true));
        assert!(!decoder.cv_valid(30, false));
        assert_eq!(decoder.cv_read(29), Ok(2));
        assert_eq!(decoder.cv_read(30), Err(Error::UnknownCv(30)));
        assert_eq!(decoder.cv_write(8, 13), Err(Error::NotWritable(8)));
        assert_eq!(decoder.cv_read(8), Ok(0));
    }

    #[test]
    fn test_erased_storage_arms_factory_reset() {
        let mut decoder = decoder_with(RecordingStorage::erased());
        assert_eq!(decoder.cvs().factory_reset(), FactoryReset::Pending(14));

        assert!(decoder.poll(false).unwrap());
        assert_eq!(decoder.storage().write_count(), 0);

        let mut steps = 0;
        while decoder.poll(true).unwrap() {
            steps += 1;
        }
        assert_eq!(steps + 1, 14);
        assert_eq!(decoder.cv_read(1), Ok(3));
        assert_eq!(decoder.cv_read(7), Ok(0xFF));
        assert_eq!(decoder.cv_read(1000), Ok(50));
        // erased function bytes leave every function on, F20 selects set 2
        assert_eq!(driven(&decoder), LightOutput::new(0, gamma_cool(29)));
    }

    #[test]
    fn test_auto_factory_default_disabled() {
        let config = DecoderConfig {
            auto_factory_default: false,
            ..DecoderConfig::interior_light()
        };
        let decoder: TestDecoder =
            Decoder::new(&config, RecordingStorage::erased(), RecordingDriver::default()).unwrap();
        assert_eq!(decoder.cvs().factory_reset(), FactoryReset::Idle);
    }

    #[test]
    fn test_factory_reset_request_restores_defaults() {
        let mut decoder = programmed();
        decoder.cv_write(1000, 120).unwrap();
        decoder.cv_write(19, 44).unwrap();
        decoder.factory_reset_requested();
        while decoder.step_factory_reset(true).unwrap() {}
        assert_eq!(decoder.cv_read(1000), Ok(50));
        assert_eq!(decoder.cv_read(19), Ok(0));
        assert!(!decoder.poll(true).unwrap());
    }

    #[test]
    fn test_service_mode_keeps_outputs_dark() {
        let mut decoder = programmed();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        decoder.service_mode_changed(true);
        assert!(decoder.is_service_mode());
        assert_eq!(driven(&decoder), LightOutput::OFF);

        decoder.cv_write(1001, 0).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(gamma_warm(49), 0));
        assert_eq!(driven(&decoder), LightOutput::OFF);

        decoder.service_mode_changed(false);
        assert_eq!(driven(&decoder), LightOutput::new(gamma_warm(49), 0));
    }

    #[test]
    fn test_acknowledge_pulse() {
        let mut decoder = programmed();
        decoder.service_mode_changed(true);
        let before = decoder.output_driver().history.len();

        let start = Instant::now();
        decoder.acknowledge_pulse();
        assert!(start.elapsed().as_millis() >= 6);

        let pulse = &decoder.output_driver().history[before..];
        assert_eq!(
            pulse,
            &[
                (LightChannel::WarmWhite, 255),
                (LightChannel::CoolWhite, 255),
                (LightChannel::WarmWhite, 0),
                (LightChannel::CoolWhite, 0),
            ]
        );
    }

    #[test]
    fn test_acknowledge_pulse_ends_dark() {
        let mut decoder = programmed();
        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        assert_eq!(driven(&decoder), LightOutput::new(0, 7));

        decoder.acknowledge_pulse();
        assert_eq!(driven(&decoder), LightOutput::OFF);
        assert_eq!(decoder.output(), LightOutput::new(0, 7));

        decoder.cv_write(CV_LIGHT_BRIGHTNESS, 200).unwrap();
        assert_ne!(driven(&decoder), LightOutput::OFF);
    }

    #[test]
    fn test_event_queue_drains_in_order() {
        let queue = EventQueue::<4>::new();
        let sender = queue.sender();
        let mut decoder = programmed();

        sender.function_group(FunctionGroup::F0To4, 0x01).unwrap();
        sender.cv_write(1000, 255).unwrap();
        decoder.process_pending(&queue.receiver()).unwrap();

        assert_eq!(decoder.cv_read(1000), Ok(255));
        assert_eq!(decoder.output(), LightOutput::new(0, gamma_cool(254)));
    }

    #[test]
    fn test_event_queue_full() {
        let queue = EventQueue::<1>::new();
        let sender = queue.sender();
        sender.try_send(DecoderEvent::FactoryReset).unwrap();
        let rejected = sender.try_send(DecoderEvent::ServiceMode(true)).unwrap_err();
        assert_eq!(rejected.0, DecoderEvent::ServiceMode(true));
    }

    #[test]
    fn test_rejected_event_stops_processing() {
        let queue = EventQueue::<4>::new();
        let sender = queue.sender();
        let mut decoder = programmed();

        sender.cv_write(7, 1).unwrap();
        sender.function_group(FunctionGroup::F0To4, 0x01).unwrap();
        assert_eq!(
            decoder.process_pending(&queue.receiver()),
            Err(Error::NotWritable(7))
        );
        assert!(!decoder.is_function_active(1));

        decoder.process_pending(&queue.receiver()).unwrap();
        assert!(decoder.is_function_active(1));
    }

    #[test]
    fn test_custom_tables() {
        let mut decoder = programmed().with_tables(
            LuminanceTable::with_gamma(1.0, 255),
            LuminanceTable::with_gamma(1.0, 255),
        );
        decoder.function_group_changed(FunctionGroup::F0To4, 0x01).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(0, 49));
    }

    #[test]
    fn test_missing_light_cv() {
        let table = [CvDefinition::new(1000, 50), CvDefinition::new(1001, 255)];
        let config = DecoderConfig {
            cvs: &table,
            ..DecoderConfig::interior_light()
        };
        let result: Result<TestDecoder, _> =
            Decoder::new(&config, RecordingStorage::programmed(), RecordingDriver::default());
        assert_eq!(result.err(), Some(ConfigError::MissingLightCv(1002)));
    }

    #[test]
    fn test_minimal_light_map() {
        let table = [
            CvDefinition::new(50, 255),
            CvDefinition::new(51, 0),
            CvDefinition::new(52, 0),
        ];
        let config = DecoderConfig {
            cvs: &table,
            light: LightCvMap {
                brightness: 50,
                color_temperature: 51,
                function_control: 52,
                secondary: None,
                test_mode: None,
            },
            auto_factory_default: false,
            ..DecoderConfig::interior_light()
        };
        let mut storage = RecordingStorage::filled(0);
        storage.bytes[0] = 255;
        storage.bytes[251] = 0x10;
        let decoder: TestDecoder =
            Decoder::new(&config, storage, RecordingDriver::default()).unwrap();
        assert_eq!(decoder.output(), LightOutput::new(gamma_warm(254), 0));
    }

    #[test]
    fn test_cache_overlapping_cvs() {
        let config = DecoderConfig {
            function_cache_address: 10,
            ..DecoderConfig::interior_light()
        };
        let result: Result<TestDecoder, _> =
            Decoder::new(&config, RecordingStorage::programmed(), RecordingDriver::default());
        assert_eq!(result.err(), Some(ConfigError::CacheOverlapsCvs));
    }

    #[test]
    fn test_layout_past_address_space() {
        let config = DecoderConfig {
            function_cache_address: u16::MAX - 2,
            ..DecoderConfig::interior_light()
        };
        let result: Result<TestDecoder, _> =
            Decoder::new(&config, RecordingStorage::programmed(), RecordingDriver::default());
        assert_eq!(result.err(), Some(ConfigError::AddressOutOfRange));

        let config = DecoderConfig {
            cv_base_address: u16::MAX - 4,
            function_cache_address: 0,
            ..DecoderConfig::interior_light()
        };
        let result: Result<TestDecoder, _> =
            Decoder::new(&config, RecordingStorage::programmed(), RecordingDriver::default());
        assert_eq!(result.err(), Some(ConfigError::AddressOutOfRange));
    }
}
