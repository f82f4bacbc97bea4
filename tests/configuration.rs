//! Runtime reconfiguration, media type lookup and converter validation.

use field_filter::{
    BaseMapperConfig, CallContext, ConfigError, Converter, FieldDescriptor, Filterable,
    FilterEngine, FilterError, MapperBuilder, MediaType, MethodId, NamingStrategy,
    SerializationConfig, TypeDescriptor,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn profile_descriptor() -> TypeDescriptor {
    TypeDescriptor::new("Profile")
        .plain_fields(["user_id", "display_name"])
        .field(FieldDescriptor::new("secret").always_exclude())
}

fn engine() -> FilterEngine {
    FilterEngine::builder()
        .with_descriptor(profile_descriptor())
        .build()
        .unwrap()
}

fn ctx(media_type: MediaType) -> CallContext {
    CallContext::new(MethodId::new("Profiles", "get"), "Profile", media_type)
}

fn profile() -> Value {
    json!({"user_id": 3, "display_name": "ann", "secret": "s"})
}

fn write_json(engine: &FilterEngine, ctx: &CallContext) -> Value {
    serde_json::from_slice(&engine.write(&profile(), ctx).unwrap()).unwrap()
}

#[test]
fn test_replaced_mapper_rebuilds_cached_serializer() {
    let engine = engine();
    let ctx = ctx(MediaType::application_json());

    assert_eq!(
        write_json(&engine, &ctx),
        json!({"user_id": 3, "display_name": "ann"})
    );

    engine
        .configuration()
        .set_mapper(
            MediaType::application_json(),
            BaseMapperConfig::json().with_naming(NamingStrategy::CamelCase),
        )
        .unwrap();

    assert_eq!(
        write_json(&engine, &ctx),
        json!({"userId": 3, "displayName": "ann"})
    );
    assert_eq!(engine.metrics().stale_rebuilds(), 1);
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn test_serialization_config_change_rebuilds() {
    let engine = engine();
    let ctx = ctx(MediaType::application_json());
    let compact = engine.write(&profile(), &ctx).unwrap();

    engine
        .configuration()
        .set_serialization_config(SerializationConfig::new().with_pretty(true));
    let pretty = engine.write(&profile(), &ctx).unwrap();

    assert_ne!(compact, pretty);
    assert!(String::from_utf8(pretty).unwrap().contains('\n'));
    assert_eq!(engine.metrics().stale_rebuilds(), 1);
}

struct Address;

impl Filterable for Address {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("Address")
            .plain_fields(["street"])
            .field(FieldDescriptor::new("geo").always_exclude())
    }
}

#[test]
fn test_type_registered_after_first_write_is_filtered() {
    let engine = FilterEngine::builder()
        .with_descriptor(
            TypeDescriptor::new("Customer")
                .plain_fields(["id"])
                .field(FieldDescriptor::new("address").nested("Address")),
        )
        .build()
        .unwrap();
    let ctx = CallContext::new(
        MethodId::new("Customers", "get"),
        "Customer",
        MediaType::application_json(),
    );
    let customer = json!({"id": 1, "address": {"street": "s", "geo": "secret"}});

    let write = |engine: &FilterEngine| -> Value {
        serde_json::from_slice(&engine.write(&customer, &ctx).unwrap()).unwrap()
    };

    assert_eq!(write(&engine), customer);

    engine.register::<Address>();
    let expected = json!({"id": 1, "address": {"street": "s"}});
    assert_eq!(write(&engine), expected);
    assert_eq!(engine.metrics().stale_rebuilds(), 1);

    let fresh = FilterEngine::builder()
        .with_descriptor(
            TypeDescriptor::new("Customer")
                .plain_fields(["id"])
                .field(FieldDescriptor::new("address").nested("Address")),
        )
        .with_type::<Address>()
        .build()
        .unwrap();
    assert_eq!(write(&fresh), expected);
}

#[test]
fn test_vendor_json_uses_suffix_wildcard() {
    let engine = engine();
    let vendor = MediaType::parse("application/vnd.acme.v2+json").unwrap();
    engine
        .configuration()
        .set_mapper(
            MediaType::parse("application/*+json").unwrap(),
            BaseMapperConfig::json().with_naming(NamingStrategy::KebabCase),
        )
        .unwrap();

    assert_eq!(
        write_json(&engine, &ctx(vendor)),
        json!({"user-id": 3, "display-name": "ann"})
    );
}

#[test]
fn test_unregistered_charset_falls_back_to_plain_type() {
    let engine = engine();
    engine
        .configuration()
        .set_mapper(
            MediaType::application_json(),
            BaseMapperConfig::json().with_naming(NamingStrategy::CamelCase),
        )
        .unwrap();
    let latin1 = MediaType::parse("application/json; charset=ISO-8859-1").unwrap();

    assert_eq!(
        write_json(&engine, &ctx(latin1)),
        json!({"userId": 3, "displayName": "ann"})
    );
}

#[test]
fn test_set_mapper_rejects_mismatched_format() {
    let engine = engine();
    let config = engine.configuration();

    let err = config
        .set_mapper(MediaType::application_json(), BaseMapperConfig::xml())
        .unwrap_err();
    assert!(matches!(err, ConfigError::FormatMismatch { .. }));

    let err = config
        .set_mapper(
            MediaType::parse("text/plain").unwrap(),
            BaseMapperConfig::json(),
        )
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedMediaType(_)));

    assert_eq!(
        config.get_mapper(&MediaType::application_json()),
        Some(BaseMapperConfig::json())
    );
}

#[test]
fn test_unsupported_media_type_fails_write() {
    let engine = engine();
    let err = engine
        .write(&profile(), &ctx(MediaType::parse("text/plain").unwrap()))
        .unwrap_err();

    assert!(matches!(err, FilterError::UnsupportedMediaType(_)));
    assert_eq!(engine.metrics().fallbacks(), 1);
}

#[test]
fn test_missing_mapper_writes_with_format_default() {
    let engine = FilterEngine::builder()
        .with_descriptor(profile_descriptor())
        .without_default_mappers()
        .build()
        .unwrap();
    let ctx = ctx(MediaType::application_json());

    assert!(engine.serializer_for(&ctx).is_none());
    assert_eq!(engine.metrics().fallbacks(), 1);
    assert_eq!(write_json(&engine, &ctx), profile());
    assert_eq!(engine.metrics().fallbacks(), 2);
}

#[test]
fn test_invalidate_media_type() {
    let engine = engine();
    engine.serializer_for(&ctx(MediaType::application_json()));
    engine.serializer_for(&ctx(MediaType::application_json_utf8()));

    assert_eq!(
        engine
            .cache()
            .invalidate_media_type(&MediaType::application_json()),
        1
    );
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn test_custom_converter_validation() {
    let engine = engine();
    let config = engine.configuration();
    let filtered: Arc<dyn field_filter::Mapper> =
        Arc::new(MapperBuilder::new(&BaseMapperConfig::json()).build());

    let err = config
        .with_custom_converter(Converter::new(" ", Arc::clone(&filtered)))
        .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyConverterName));

    let err = config
        .with_custom_converter(Converter::new("audit", Arc::clone(&filtered)))
        .unwrap_err();
    assert!(matches!(err, ConfigError::NoConverterMediaTypes(_)));

    let err = config
        .with_custom_converter(
            Converter::new("raw", Arc::new(BaseMapperConfig::json()))
                .with_media_type(MediaType::application_json()),
        )
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnfilteredConverter(_)));

    config
        .with_custom_converter(
            Converter::new("audit", filtered).with_media_type(MediaType::application_json()),
        )
        .unwrap();
    assert_eq!(config.custom_converters().len(), 1);
    let found = config
        .custom_converter_for(&MediaType::application_json_utf8())
        .unwrap();
    assert_eq!(found.name(), "audit");
}

#[test]
fn test_toggle_enabled_at_runtime() {
    let engine = engine();
    let ctx = ctx(MediaType::application_json());

    engine.configuration().set_enabled(false);
    assert_eq!(write_json(&engine, &ctx), profile());

    engine.configuration().set_enabled(true);
    assert_eq!(
        write_json(&engine, &ctx),
        json!({"user_id": 3, "display_name": "ann"})
    );
}
