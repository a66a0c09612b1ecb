use etlwatch::config::{MailConfig, TlsMode};
use etlwatch::mail::{MemoryMailer, Notifier};
use etlwatch::source::{CatalogError, Lookup, MemorySource, StagingError, WarehouseError};
use etlwatch::{run_catalog, run_job_log, Outcome, RunOptions};

fn mail_config() -> MailConfig {
    MailConfig {
        host: "smtp.example.com".into(),
        port: 587,
        sender: "etl@example.com".into(),
        password: "hunter2".into(),
        recipients: vec!["ops@example.com".into()],
        tls: TlsMode::StartTls,
        timeout: None,
    }
}

fn notifier(mailer: MemoryMailer) -> Notifier<MemoryMailer> {
    Notifier::new(mailer, &mail_config())
}

fn load_fact(job_id: i64) -> WarehouseError {
    WarehouseError {
        job_id,
        transformation: "Load_Fact".into(),
        description: "java.lang.Exception\n\tat com.foo.Bar.run(Bar.java:10)\nReal cause here\nReal cause here".into(),
    }
}

fn invalid_date(job_id: i64) -> StagingError {
    StagingError {
        job_id,
        transformation: "Stg_Utentes".into(),
        field: "data_nascimento".into(),
        description: "Data inválida".into(),
    }
}

#[tokio::test]
async fn warehouse_errors_only_produce_one_section() {
    let source = MemorySource::new()
        .with_latest_job(42)
        .with_warehouse_errors(vec![load_fact(42), load_fact(41)])
        .with_staging_errors(vec![invalid_date(41)]);
    let notifier = notifier(MemoryMailer::new());

    let outcome = run_job_log(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Notified);
    let sent = notifier.mailer().sent().await;
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert!(email.subject.contains("PENTAHO"));
    assert_eq!(email.text.matches("[ERROS DW]").count(), 1);
    assert_eq!(email.text.matches("JobID: 42").count(), 1);
    assert!(email.text.contains("Transformação: Load_Fact"));
    assert!(email.text.contains("Descrição: Real cause here\n"));
    assert!(!email.text.contains("[ERROS SA]"));
    assert!(!email.text.contains("Bar.java"));
}

#[tokio::test]
async fn both_sources_get_sections() {
    let source = MemorySource::new()
        .with_latest_job(7)
        .with_warehouse_errors(vec![load_fact(7)])
        .with_staging_errors(vec![invalid_date(7)]);
    let notifier = notifier(MemoryMailer::new());

    run_job_log(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    let text = &notifier.mailer().sent().await[0].text;
    let dw = text.find("[ERROS DW] (tabela etl_erros_dw)").unwrap();
    let sa = text.find("[ERROS SA] (tabela etl_erros_staging)").unwrap();
    assert!(dw < sa);
    assert!(text.contains("Campo: data_nascimento"));
}

#[tokio::test]
async fn job_without_errors_sends_nothing() {
    let source = MemorySource::new()
        .with_latest_job(42)
        .with_warehouse_errors(vec![load_fact(41)])
        .with_staging_errors(vec![]);
    let notifier = notifier(MemoryMailer::new());

    let outcome = run_job_log(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::NothingToReport);
    assert_eq!(outcome.exit_code(), 0);
    assert!(notifier.mailer().sent().await.is_empty());
}

#[tokio::test]
async fn empty_job_table_stops_before_error_lookups() {
    let source = MemorySource::new().with_warehouse_errors(vec![load_fact(1)]);
    let notifier = notifier(MemoryMailer::new());

    let outcome = run_job_log(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::NothingToReport);
    assert_eq!(source.lookups().await, vec![Lookup::LatestJob]);
    assert!(notifier.mailer().sent().await.is_empty());
}

#[tokio::test]
async fn explicit_job_id_skips_latest_lookup() {
    let source = MemorySource::new()
        .with_latest_job(42)
        .with_warehouse_errors(vec![load_fact(41)]);
    let notifier = notifier(MemoryMailer::new());
    let options = RunOptions {
        job_id: Some(41),
        ..RunOptions::default()
    };

    let outcome = run_job_log(&source, &notifier, &options).await.unwrap();

    assert_eq!(outcome, Outcome::Notified);
    assert_eq!(source.lookups().await, vec![Lookup::Warehouse]);
    assert!(notifier.mailer().sent().await[0].text.contains("JobID: 41"));
}

#[tokio::test]
async fn staging_failure_still_reports_warehouse_errors() {
    let source = MemorySource::new()
        .with_latest_job(42)
        .with_warehouse_errors(vec![load_fact(42)])
        .with_staging_errors(vec![invalid_date(42)])
        .failing(Lookup::Staging);
    let notifier = notifier(MemoryMailer::new());

    let outcome = run_job_log(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Notified);
    let text = &notifier.mailer().sent().await[0].text;
    assert!(text.contains("[ERROS DW]"));
    assert!(!text.contains("[ERROS SA]"));
    assert!(text.contains("[AVISO]"));
    assert!(text.contains("etl_erros_staging"));
}

#[tokio::test]
async fn every_source_failing_is_reported_without_email() {
    let source = MemorySource::new()
        .with_latest_job(42)
        .with_staging_errors(vec![])
        .failing(Lookup::Warehouse)
        .failing(Lookup::Staging);
    let notifier = notifier(MemoryMailer::new());

    let outcome = run_job_log(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::SourcesUnavailable);
    assert_eq!(outcome.exit_code(), 4);
    assert!(notifier.mailer().sent().await.is_empty());
}

#[tokio::test]
async fn delivery_failure_is_an_outcome_not_an_error() {
    let source = MemorySource::new()
        .with_latest_job(42)
        .with_warehouse_errors(vec![load_fact(42)]);
    let notifier = notifier(MemoryMailer::failing("535 authentication failed"));

    let outcome = run_job_log(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::DeliveryFailed);
    assert_eq!(outcome.exit_code(), 3);
}

#[tokio::test]
async fn report_file_is_removed_after_send() {
    let root = tempfile::tempdir().unwrap();
    let path = etlwatch::config::report_path(root.path());
    let source = MemorySource::new()
        .with_latest_job(42)
        .with_warehouse_errors(vec![load_fact(42)]);
    let options = RunOptions {
        report_path: Some(path.clone()),
        ..RunOptions::default()
    };

    let notifier = notifier(MemoryMailer::new());
    let outcome = run_job_log(&source, &notifier, &options).await.unwrap();
    assert_eq!(outcome, Outcome::Notified);
    assert!(!path.exists());

    let notifier = self::notifier(MemoryMailer::failing("connection refused"));
    let outcome = run_job_log(&source, &notifier, &options).await.unwrap();
    assert_eq!(outcome, Outcome::DeliveryFailed);
    assert!(!path.exists());
}

#[tokio::test]
async fn unwritable_report_path_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let options = RunOptions {
        report_path: Some(root.path().join("missing").join("Relatorio_Erros.txt")),
        ..RunOptions::default()
    };
    let source = MemorySource::new()
        .with_latest_job(42)
        .with_warehouse_errors(vec![load_fact(42)]);
    let notifier = notifier(MemoryMailer::new());

    let err = run_job_log(&source, &notifier, &options).await.unwrap_err();

    assert_eq!(err.exit_code(), 1);
    assert!(notifier.mailer().sent().await.is_empty());
}

#[tokio::test]
async fn empty_catalog_sends_nothing() {
    let source = MemorySource::new();
    let notifier = notifier(MemoryMailer::new());

    let outcome = run_catalog(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::NothingToReport);
    assert!(notifier.mailer().sent().await.is_empty());
}

#[tokio::test]
async fn catalog_reports_most_recent_error() {
    let older = CatalogError {
        execution_id: 100,
        message_time: None,
        message: "Old failure".into(),
        package_name: "Load_Dim.dtsx".into(),
        project_name: "BI_Hospitalar".into(),
    };
    let latest = CatalogError {
        execution_id: 101,
        message: "Cube processing failed".into(),
        package_name: "Process_Cube.dtsx".into(),
        ..older.clone()
    };
    let source = MemorySource::new().with_catalog_errors(vec![older, latest]);
    let notifier = notifier(MemoryMailer::new());

    let outcome = run_catalog(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Notified);
    let email = &notifier.mailer().sent().await[0];
    assert!(email.subject.contains("CUBO"));
    assert!(email.text.contains("[ERROS CUBO]"));
    assert!(email.text.contains("Execution ID  : 101"));
    assert!(email.text.contains("Pacote        : Process_Cube.dtsx"));
    assert!(!email.text.contains("Old failure"));
}

#[tokio::test]
async fn catalog_failure_sends_nothing() {
    let source = MemorySource::new().failing(Lookup::Catalog);
    let notifier = notifier(MemoryMailer::new());

    let outcome = run_catalog(&source, &notifier, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::SourcesUnavailable);
    assert!(notifier.mailer().sent().await.is_empty());
}
