//! End-to-end filtering scenarios through the engine.

use field_filter::{
    Argument, BaseMapperConfig, CallContext, FieldDescriptor, Filterable, FilterEngine,
    MediaType, MethodId, NamingStrategy, NullHandling, Predicate, Principal, TypeDescriptor,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Serialize)]
struct User {
    id: u64,
    name: String,
    email: String,
    password: String,
}

impl Filterable for User {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("User")
            .plain_fields(["id", "name"])
            .field(FieldDescriptor::new("email").include_when(Predicate::listed_in("fields")))
            .field(FieldDescriptor::new("password").always_exclude())
    }
}

fn ann() -> User {
    User {
        id: 1,
        name: "ann".to_string(),
        email: "ann@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

fn ctx(method: &'static str, return_type: &str) -> CallContext {
    CallContext::new(
        MethodId::new("UserController", method),
        return_type,
        MediaType::application_json(),
    )
}

fn write_json<T: Serialize>(engine: &FilterEngine, value: &T, ctx: &CallContext) -> Value {
    let bytes = engine.write(value, ctx).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn test_always_excluded_field_is_dropped() {
    let engine = FilterEngine::builder()
        .with_descriptor(
            TypeDescriptor::new("Account")
                .plain_fields(["id", "name"])
                .field(FieldDescriptor::new("password").always_exclude()),
        )
        .build()
        .unwrap();

    let output = write_json(
        &engine,
        &json!({"id": 1, "name": "ann", "password": "x"}),
        &ctx("get", "Account"),
    );
    assert_eq!(output, json!({"id": 1, "name": "ann"}));
}

#[test]
fn test_include_list_with_conditional_field() {
    let engine = FilterEngine::builder().with_type::<User>().build().unwrap();
    let ctx = ctx("get", "User").with_argument(Argument::include_list("fields", ["id"]));

    assert_eq!(write_json(&engine, &ann(), &ctx), json!({"id": 1}));
}

#[test]
fn test_listed_conditional_field_is_written() {
    let engine = FilterEngine::builder().with_type::<User>().build().unwrap();
    let ctx = ctx("get", "User").with_argument(Argument::relevant("fields", "id,email"));

    assert_eq!(
        write_json(&engine, &ann(), &ctx),
        json!({"id": 1, "name": "ann", "email": "ann@example.com"})
    );
}

#[test]
fn test_unmarked_type_matches_base_output() {
    let engine = FilterEngine::builder()
        .with_descriptor(TypeDescriptor::new("Plain").plain_fields(["a", "b"]))
        .build()
        .unwrap();
    let value = json!({"a": 1, "b": [1, 2, 3], "c": {"nested": null}});
    let ctx = ctx("plain", "Plain");

    let filtered = engine.write(&value, &ctx).unwrap();
    let base = engine
        .write_unfiltered(&value, &MediaType::application_json())
        .unwrap();
    assert_eq!(filtered, base);
    assert!(engine.serializer_for(&ctx).unwrap().filters().is_empty());
}

#[test]
fn test_excluded_fields_never_round_trip() {
    let engine = FilterEngine::builder().with_type::<User>().build().unwrap();

    for principal in [Principal::new(["ADMIN"]), Principal::default()] {
        let ctx = ctx("get", "User").with_principal(principal);
        let output = write_json(&engine, &ann(), &ctx);
        let object = output.as_object().unwrap();
        assert!(!object.contains_key("password"));
        assert!(!object.contains_key("email"));
    }
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Staff {
    id: u64,
    name: String,
    password: String,
    salary: u32,
}

#[test]
fn test_excluded_fields_come_back_as_defaults() {
    let engine = FilterEngine::builder()
        .with_descriptor(
            TypeDescriptor::new("Staff")
                .plain_fields(["id", "name"])
                .field(FieldDescriptor::new("password").always_exclude())
                .field(FieldDescriptor::new("salary").role_gated("HR")),
        )
        .build()
        .unwrap();
    let staff = Staff {
        id: 4,
        name: "bo".to_string(),
        password: "hunter2".to_string(),
        salary: 5000,
    };

    let anonymous = engine.write(&staff, &ctx("staff", "Staff")).unwrap();
    let decoded: Staff = serde_json::from_slice(&anonymous).unwrap();
    assert_eq!(
        decoded,
        Staff {
            id: 4,
            name: "bo".to_string(),
            ..Staff::default()
        }
    );

    let hr = ctx("staff", "Staff").with_principal(Principal::new(["HR"]));
    let decoded: Staff = serde_json::from_slice(&engine.write(&staff, &hr).unwrap()).unwrap();
    assert_eq!(decoded.salary, 5000);
    assert_eq!(decoded.password, "");
}

#[test]
fn test_role_gated_fields() {
    let engine = FilterEngine::builder()
        .with_descriptor(
            TypeDescriptor::new("Employee")
                .plain_fields(["id"])
                .field(FieldDescriptor::new("salary").role_gated("HR"))
                .field(
                    FieldDescriptor::new("review")
                        .include_when(Predicate::all_roles(["HR", "MANAGER"])),
                ),
        )
        .build()
        .unwrap();
    let employee = json!({"id": 5, "salary": 100, "review": "good"});

    let hr = ctx("employee", "Employee").with_principal(Principal::new(["HR"]));
    assert_eq!(
        write_json(&engine, &employee, &hr),
        json!({"id": 5, "salary": 100})
    );

    let hr_manager =
        ctx("employee", "Employee").with_principal(Principal::new(["HR", "MANAGER"]));
    assert_eq!(write_json(&engine, &employee, &hr_manager), employee);

    let anonymous = ctx("employee", "Employee");
    assert_eq!(write_json(&engine, &employee, &anonymous), json!({"id": 5}));
}

#[test]
fn test_nested_types_and_lists() {
    let engine = FilterEngine::builder()
        .with_descriptor(
            TypeDescriptor::new("Order")
                .plain_fields(["id"])
                .field(FieldDescriptor::new("customer").nested("User"))
                .field(FieldDescriptor::new("lines").nested("OrderLine")),
        )
        .with_type::<User>()
        .with_descriptor(
            TypeDescriptor::new("OrderLine")
                .plain_fields(["sku", "qty"])
                .field(FieldDescriptor::new("cost").role_gated("FINANCE")),
        )
        .build()
        .unwrap();

    let order = json!({
        "id": 10,
        "customer": {"id": 1, "name": "ann", "email": "e", "password": "p"},
        "lines": [{"sku": "a", "qty": 1, "cost": 5}, {"sku": "b", "qty": 2, "cost": 7}],
    });

    assert_eq!(
        write_json(&engine, &order, &ctx("order", "Order")),
        json!({
            "id": 10,
            "customer": {"id": 1, "name": "ann"},
            "lines": [{"sku": "a", "qty": 1}, {"sku": "b", "qty": 2}],
        })
    );
}

#[test]
fn test_exclude_list_targeting_nested_type() {
    let engine = FilterEngine::builder()
        .with_descriptor(
            TypeDescriptor::new("Order")
                .plain_fields(["id", "qty"])
                .field(FieldDescriptor::new("lines").nested("OrderLine")),
        )
        .with_descriptor(TypeDescriptor::new("OrderLine").plain_fields(["sku", "qty"]))
        .build()
        .unwrap();

    let ctx = ctx("order", "Order")
        .with_argument(Argument::exclude_list("hide", ["qty"]).for_type("OrderLine"));
    let order = json!({"id": 1, "qty": 3, "lines": [{"sku": "a", "qty": 1}]});

    assert_eq!(
        write_json(&engine, &order, &ctx),
        json!({"id": 1, "qty": 3, "lines": [{"sku": "a"}]})
    );
}

#[test]
fn test_top_level_collection_of_root_type() {
    let engine = FilterEngine::builder().with_type::<User>().build().unwrap();
    let users = vec![ann(), ann()];

    let output = write_json(&engine, &users, &ctx("list", "User"));
    assert_eq!(
        output,
        json!([{"id": 1, "name": "ann"}, {"id": 1, "name": "ann"}])
    );
}

#[test]
fn test_disabled_engine_writes_everything() {
    let engine = FilterEngine::builder()
        .with_type::<User>()
        .with_enabled(false)
        .build()
        .unwrap();

    let output = write_json(&engine, &ann(), &ctx("get", "User"));
    assert_eq!(output, serde_json::to_value(ann()).unwrap());
}

#[test]
fn test_second_set_mapper_replaces_first() {
    let engine = FilterEngine::builder().with_type::<User>().build().unwrap();
    let config = engine.configuration();
    config
        .set_mapper(
            MediaType::application_json(),
            BaseMapperConfig::json().with_naming(NamingStrategy::KebabCase),
        )
        .unwrap();
    config
        .set_mapper(
            MediaType::application_json(),
            BaseMapperConfig::json().with_naming(NamingStrategy::CamelCase),
        )
        .unwrap();

    let ctx = ctx("get", "User").with_argument(Argument::relevant("fields", "email"));
    let output = write_json(
        &engine,
        &json!({"id": 1, "name": "ann", "email": "e", "password": "p", "display_name": null}),
        &ctx,
    );
    assert_eq!(
        output,
        json!({"id": 1, "name": "ann", "email": "e", "displayName": null})
    );
}

#[test]
fn test_serialization_options_apply_to_filtered_output() {
    let engine = FilterEngine::builder()
        .with_type::<User>()
        .with_serialization_config(
            field_filter::SerializationConfig::new().with_null_handling(NullHandling::Omit),
        )
        .build()
        .unwrap();

    let output = write_json(
        &engine,
        &json!({"id": 1, "name": null, "password": "p"}),
        &ctx("get", "User"),
    );
    assert_eq!(output, json!({"id": 1}));
}
