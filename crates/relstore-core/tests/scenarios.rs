//! End-to-end scenarios exercising the whole stack — catalog, constraint
//! validation, the resolver, the transaction coordinator, and the
//! repository façade — together rather than in isolation.

use std::sync::Arc;

use relstore_core::lang::{parse, Params};
use relstore_core::proto::{RowId, TableRecord, Value};
use relstore_core::{
    Catalog, Coordinator, EntityDef, EntityRepository, Error, FieldDef, FieldInvalidKind,
    FieldType, ResolutionRules, Store,
};

fn setup() -> (Arc<Catalog>, Arc<Coordinator>, EntityRepository) {
    let catalog = Arc::new(Catalog::new());

    catalog
        .register(
            EntityDef::new("Address", "id")
                .with_field(FieldDef::new("id", FieldType::Int))
                .with_field(FieldDef::new("state", FieldType::Text))
                .with_field(FieldDef::new("city", FieldType::Text))
                .with_field(FieldDef::new("street", FieldType::Text))
                .with_field(FieldDef::new("zip", FieldType::Int)),
        )
        .unwrap();

    catalog
        .register(
            EntityDef::new("Role", "id")
                .with_field(FieldDef::new("id", FieldType::Int))
                .with_field(FieldDef::new("name", FieldType::Text)),
        )
        .unwrap();

    catalog
        .register(
            EntityDef::new("User", "id")
                .with_field(FieldDef::new("id", FieldType::Int))
                .with_field(FieldDef::new("email", FieldType::Text).with_unique())
                .with_field(FieldDef::new("phone", FieldType::Text))
                .with_field(FieldDef::new(
                    "address",
                    FieldType::Ref {
                        target: "Address".into(),
                    },
                ))
                .with_field(FieldDef::new(
                    "roles",
                    FieldType::ListRef {
                        target: "Role".into(),
                    },
                )),
        )
        .unwrap();

    let store = Arc::new(Store::new());
    let coordinator = Arc::new(Coordinator::new(store));
    let repo = EntityRepository::new(catalog.clone(), coordinator.clone());
    (catalog, coordinator, repo)
}

fn address_ny() -> TableRecord {
    let mut r = TableRecord::new();
    r.set("id", Value::Id(RowId::Int(1)));
    r.set("state", Value::Text("NY".into()));
    r.set("city", Value::Text("New York".into()));
    r.set("street", Value::Text("street A".into()));
    r.set("zip", Value::Int(101));
    r
}

fn role_admin() -> TableRecord {
    let mut r = TableRecord::new();
    r.set("id", Value::Id(RowId::Int(1)));
    r.set("name", Value::Text("admin".into()));
    r
}

fn joe(address_id: RowId, role_id: RowId) -> TableRecord {
    let mut r = TableRecord::new();
    r.set("email", Value::Text("joe@x.com".into()));
    r.set("phone", Value::Text("123".into()));
    r.set("address", Value::Id(address_id));
    r.set("roles", Value::IdList(vec![role_id]));
    r
}

/// Scenario 1: insert then select by FK.
#[test]
fn insert_then_select_by_address_state() {
    let (_, _, repo) = setup();

    let address_id = repo.store("Address", Some(RowId::Int(1)), address_ny()).unwrap();
    let role_id = repo.store("Role", Some(RowId::Int(1)), role_admin()).unwrap();
    assert_eq!(address_id, RowId::Int(1));
    assert_eq!(role_id, RowId::Int(1));

    let user_id = repo.store("User", None, joe(address_id, role_id)).unwrap();
    assert_eq!(user_id, RowId::Int(1));

    let matcher = parse("address.state == ?").unwrap();
    let params = Params::new().with_positional(vec![Value::Text("NY".into())]);
    let results = repo
        .select("User", &matcher, &params, ResolutionRules::EagerAll)
        .unwrap();

    assert_eq!(results.len(), 1);
    let user = &results[0];
    assert_eq!(user.get("email"), Some(&Value::Text("joe@x.com".into())));

    let Some(Value::Record(address)) = user.get("address") else {
        panic!("expected address to resolve to a nested record");
    };
    assert_eq!(address.get("id"), Some(&Value::Id(RowId::Int(1))));

    let Some(Value::RecordList(roles)) = user.get("roles") else {
        panic!("expected roles to resolve to a nested record list");
    };
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].get("id"), Some(&Value::Id(RowId::Int(1))));
}

/// Scenario 2: unique violation.
#[test]
fn duplicate_email_fails_unique_constraint() {
    let (_, _, repo) = setup();
    let address_id = repo.store("Address", Some(RowId::Int(1)), address_ny()).unwrap();
    let role_id = repo.store("Role", Some(RowId::Int(1)), role_admin()).unwrap();
    repo.store("User", None, joe(address_id.clone(), role_id.clone())).unwrap();

    let err = repo
        .store("User", None, joe(address_id, role_id))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::FieldInvalid {
            kind: FieldInvalidKind::Unique,
            ref field,
            ..
        } if field == "email"
    ));
    assert_eq!(repo.length("User"), 1);
}

/// Scenario 3: delete blocked by an inbound FK.
#[test]
fn delete_referenced_address_fails_with_delete_constraint() {
    let (_, _, repo) = setup();
    let address_id = repo.store("Address", Some(RowId::Int(1)), address_ny()).unwrap();
    let role_id = repo.store("Role", Some(RowId::Int(1)), role_admin()).unwrap();
    repo.store("User", None, joe(address_id.clone(), role_id)).unwrap();

    let matcher = parse("#ID == ?").unwrap();
    let params = Params::new().with_positional(vec![Value::Id(address_id.clone())]);
    let err = repo.delete("Address", &matcher, &params).unwrap_err();

    match err {
        Error::DeleteConstraint {
            source_table,
            field,
            target_id,
            ..
        } => {
            assert_eq!(source_table, "User");
            assert_eq!(field, "address");
            assert_eq!(target_id, address_id.to_string());
        }
        other => panic!("expected DeleteConstraint, got {other:?}"),
    }
}

/// Scenario 4: cascade delete removes the user, its role-join row, and its
/// owned address.
#[test]
fn cascade_delete_removes_user_role_row_and_address() {
    let (_, _, repo) = setup();
    let address_id = repo.store("Address", Some(RowId::Int(1)), address_ny()).unwrap();
    let role_id = repo.store("Role", Some(RowId::Int(1)), role_admin()).unwrap();
    let user_id = repo
        .store("User", None, joe(address_id.clone(), role_id.clone()))
        .unwrap();

    let removed = repo.delete_entity_cascade("User", &user_id).unwrap();
    assert_eq!(removed.len(), 3);

    assert!(!repo.exists_id("User", &user_id));
    assert!(!repo.exists_id("Address", &address_id));
    assert_eq!(repo.length("User"), 0);
    assert_eq!(repo.length("Address"), 0);
    // The Role entity itself survives — only the join row linking it to the
    // deleted user is removed.
    assert!(repo.exists_id("Role", &role_id));
}

/// Scenario 5: abort discards writes made inside the transaction.
#[test]
fn abort_rolls_back_email_change() {
    let (catalog, coordinator, repo) = setup();
    let address_id = repo.store("Address", Some(RowId::Int(1)), address_ny()).unwrap();
    let role_id = repo.store("Role", Some(RowId::Int(1)), role_admin()).unwrap();
    let user_id = repo
        .store("User", None, joe(address_id.clone(), role_id.clone()))
        .unwrap();

    let tx = coordinator.open();
    let result = coordinator.execute(tx, |handle| {
        let mut changed = joe(address_id.clone(), role_id.clone());
        changed.set("email", Value::Text("smith5@x.com".into()));
        handle.put("User", &catalog, Some(user_id.clone()), changed)?;
        handle.abort("Test")?;
        Ok(())
    });
    assert!(result.is_ok());

    let matcher = parse("email == ?").unwrap();
    let changed_params = Params::new().with_positional(vec![Value::Text("smith5@x.com".into())]);
    let original_params = Params::new().with_positional(vec![Value::Text("joe@x.com".into())]);

    let changed = repo
        .select("User", &matcher, &changed_params, ResolutionRules::Shallow)
        .unwrap();
    assert!(changed.is_empty());

    let original = repo
        .select("User", &matcher, &original_params, ResolutionRules::Shallow)
        .unwrap();
    assert_eq!(original.len(), 1);
    assert_eq!(original[0].get("email"), Some(&Value::Text("joe@x.com".into())));

    assert_eq!(coordinator.abort_reason(tx).as_deref(), Some("Test"));
}

/// Scenario 6: `IN` over a literal list, and `=~` matching a single scalar.
#[test]
fn query_in_list_and_scalar_contains() {
    let (_, _, repo) = setup();

    let ny = repo.store("Address", Some(RowId::Int(1)), address_ny()).unwrap();
    let mut ca1 = address_ny();
    ca1.set("id", Value::Id(RowId::Int(2)));
    ca1.set("state", Value::Text("CA".into()));
    ca1.set("city", Value::Text("Los Angeles".into()));
    let ca1_id = repo.store("Address", Some(RowId::Int(2)), ca1).unwrap();
    let mut ca2 = address_ny();
    ca2.set("id", Value::Id(RowId::Int(3)));
    ca2.set("state", Value::Text("CA".into()));
    ca2.set("city", Value::Text("San Francisco".into()));
    let ca2_id = repo.store("Address", Some(RowId::Int(3)), ca2).unwrap();

    let role_id = repo.store("Role", Some(RowId::Int(1)), role_admin()).unwrap();

    let mut u1 = joe(ny.clone(), role_id.clone());
    u1.set("email", Value::Text("u1@x.com".into()));
    repo.store("User", None, u1).unwrap();

    let mut u2 = joe(ca1_id.clone(), role_id.clone());
    u2.set("email", Value::Text("u2@x.com".into()));
    repo.store("User", None, u2).unwrap();

    let mut u3 = joe(ca2_id, role_id);
    u3.set("email", Value::Text("u3@x.com".into()));
    repo.store("User", None, u3).unwrap();

    let in_both = parse(r#"address.state IN ["NY", "CA"]"#).unwrap();
    let results = repo
        .select("User", &in_both, &Params::new(), ResolutionRules::Shallow)
        .unwrap();
    assert_eq!(results.len(), 3);

    let in_ny_only = parse(r#"address.state IN ["NY"]"#).unwrap();
    let results = repo
        .select("User", &in_ny_only, &Params::new(), ResolutionRules::Shallow)
        .unwrap();
    assert_eq!(results.len(), 1);

    let contains_scalar = parse("address.state =~ ?").unwrap();
    let params = Params::new().with_positional(vec![Value::Text("NY".into())]);
    let results = repo
        .select("User", &contains_scalar, &params, ResolutionRules::Shallow)
        .unwrap();
    assert_eq!(results.len(), 1);
}
