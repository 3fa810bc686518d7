//! End-to-end HR flow: hire, protect the role, search, amend, dismiss.
//!
//! Run with: cargo test --package assim-storage --test hr_flow

use assim_storage::models::{EmployeeFilter, EmployeePatch, NewEmployee, NewRole};
use assim_storage::{
    Database, EmployeeRepository, ErrorKind, Messages, RoleRepository, SqlEmployeeRepository,
    SqlRoleRepository, StorageError,
};
use futures::future::join_all;

async fn setup() -> (SqlRoleRepository, SqlEmployeeRepository) {
    let db = Database::in_memory().await.unwrap();
    (
        SqlRoleRepository::new(db.clone()),
        SqlEmployeeRepository::new(db),
    )
}

#[tokio::test]
async fn test_hiring_flow() {
    let (roles, employees) = setup().await;

    let nurse = roles
        .create(&NewRole::new("Enfermeiro", 3200.0))
        .await
        .unwrap()
        .unwrap();
    roles
        .create(&NewRole::new("Enfermeira Chefe", 5400.0))
        .await
        .unwrap();
    roles
        .create(&NewRole::new("enfermeiro auxiliar", 2100.0))
        .await
        .unwrap();

    let ana = employees
        .create(&NewEmployee::new("Ana Silva", "11144477735").cargo_id(nurse))
        .await
        .unwrap()
        .unwrap();

    // Same CPF with punctuation is still a duplicate
    let err = employees
        .create(&NewEmployee::new("Ana S.", "111.444.777-35").cargo_id(nurse))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.public_message(), Messages::DUPLICATE_CPF);
    assert_eq!(employees.count().await.unwrap(), 1);

    // A role with employees cannot be removed
    let err = roles.delete(nurse).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(ref m) if m == Messages::ROLE_IN_USE));
    assert_eq!(err.status_code().as_u16(), 409);
    assert!(roles.find_by_id(nurse).await.unwrap().is_some());

    // Case-sensitive substring, newest first
    let names: Vec<String> = roles
        .list("Enfer")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.nome)
        .collect();
    assert_eq!(names, vec!["Enfermeira Chefe", "Enfermeiro"]);

    // Only the telefone changes
    let before = employees.find_by_id(ana).await.unwrap().unwrap();
    let patch: EmployeePatch = serde_json::from_str(r#"{"telefone": "(11) 98888-7777"}"#).unwrap();
    let after = employees.update(ana, &patch).await.unwrap();
    assert_eq!(after.telefone.as_deref(), Some("(11) 98888-7777"));
    assert_eq!(after.nome, before.nome);
    assert_eq!(after.cpf, before.cpf);
    assert_eq!(after.cargo_id, before.cargo_id);
    assert_eq!(after.cargo.as_deref(), Some("Enfermeiro"));
    assert_eq!(after.created_at, before.created_at);

    let found = employees
        .list(&EmployeeFilter::default().cpf("444.777"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ana);

    // Dismiss, then the role is free to go
    employees.delete(ana).await.unwrap();
    let err = employees.delete(ana).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status_code().as_u16(), 404);

    roles.delete(nurse).await.unwrap();
    assert!(roles.find_by_id(nurse).await.unwrap().is_none());
}

#[tokio::test]
async fn test_validation_leaves_store_untouched() {
    let (roles, employees) = setup().await;

    let err = employees
        .create(&NewEmployee::new("Ana Silva", "123.456.789-00"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.status_code().as_u16(), 400);
    assert_eq!(err.public_message(), "CPF inválido");

    let err = roles.create(&NewRole::new("", 1000.0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(roles.count().await.unwrap(), 0);
    assert_eq!(employees.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_hires_with_same_cpf() {
    let db = Database::in_memory().await.unwrap();

    let attempts = (0..5).map(|i| {
        let repo = SqlEmployeeRepository::new(db.clone());
        async move {
            repo.create(&NewEmployee::new(format!("Candidato {i}"), "52998224725"))
                .await
        }
    });
    let results = join_all(attempts).await;

    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Conflict))
        .count();

    assert_eq!(created, 1);
    assert_eq!(conflicts, 4);
    assert_eq!(SqlEmployeeRepository::new(db).count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_hire_and_role_delete_never_orphan() {
    let db = Database::in_memory().await.unwrap();
    let roles = SqlRoleRepository::new(db.clone());

    let mut cargo_ids = Vec::new();
    for i in 0..4 {
        let id = roles
            .create(&NewRole::new(format!("Plantonista {i}"), 2800.0))
            .await
            .unwrap()
            .unwrap();
        cargo_ids.push(id);
    }

    let cpfs = ["11144477735", "52998224725", "71428793860", "39053344705"];
    let outcomes = join_all(cargo_ids.iter().zip(cpfs).map(|(&cargo_id, cpf)| {
        let roles = SqlRoleRepository::new(db.clone());
        let employees = SqlEmployeeRepository::new(db.clone());
        async move {
            let new_employee = NewEmployee::new("Temporário", cpf).cargo_id(cargo_id);
            let (hired, deleted) = tokio::join!(
                employees.create(&new_employee),
                roles.delete(cargo_id),
            );
            (cargo_id, hired, deleted)
        }
    }))
    .await;

    let employees = SqlEmployeeRepository::new(db.clone());
    for (cargo_id, hired, deleted) in outcomes {
        match (hired, deleted) {
            (Ok(Some(id)), Err(err)) => {
                assert_eq!(err.public_message(), Messages::ROLE_IN_USE);
                let employee = employees.find_by_id(id).await.unwrap().unwrap();
                assert_eq!(employee.cargo_id, Some(cargo_id));
                assert!(roles.find_by_id(cargo_id).await.unwrap().is_some());
            }
            (Err(err), Ok(())) => {
                assert_eq!(err.public_message(), Messages::UNKNOWN_ROLE);
                assert!(roles.find_by_id(cargo_id).await.unwrap().is_none());
            }
            other => panic!("hire and delete of cargo {cargo_id} both settled as {other:?}"),
        }
    }

    let orphans = employees
        .list(&EmployeeFilter::default())
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.cargo_id.is_none())
        .count();
    assert_eq!(orphans, 0);
}
