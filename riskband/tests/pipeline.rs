// riskband/tests/pipeline.rs
//
// End-to-end batch runs over temporary input files.

use std::path::{Path, PathBuf};

use riskband::{run, RunConfig};
use tempfile::TempDir;

const HEADER: [&str; 8] = [
    "sessionid", "accountid", "unixtime", "ip", "device_type",
    "shipping_info", "cart_info", "eventtriggeredsignals",
];

fn shipping(country: &str) -> String {
    format!(
        r#"{{"ShippingAddress": {{"shippingcountry": "{country}", "shippingzipcode": "94107",
            "shippingstreet": "1 Main St", "shippingstate": "CA",
            "shippingnamefirst": "Sam", "shippingnamelast": "Lee"}},
            "BillingAddress": {{"billingzipcode": "94107"}}}}"#
    )
}

fn cart(price: f64, quantity: u32, kind: &str) -> String {
    format!(
        r#"{{"CartProduct": {{"all": [{{"productPrice": {price}, "productQuantity": {quantity}, "productType": "{kind}"}}]}}}}"#
    )
}

/// Input order deliberately differs from time order: s3 follows s2 in time
/// but comes first in the file.
fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let data = dir.join("transactions.csv");
    let mut wtr = csv::Writer::from_path(&data).unwrap();
    wtr.write_record(HEADER).unwrap();
    wtr.write_record([
        "s3", "b@example.com", "2", "2.2.2.2", "mobile",
        shipping("CA").as_str(), cart(50.0, 2, "books").as_str(), "",
    ]).unwrap();
    wtr.write_record([
        "s1", "a@example.com", "5", "1.1.1.1", "mobile",
        shipping("US").as_str(), cart(20.0, 1, "toys").as_str(), "[]",
    ]).unwrap();
    wtr.write_record([
        "s2", "b@example.com", "1", "2.2.2.2", "mobile",
        shipping("US").as_str(), cart(100.0, 1, "books").as_str(), r#"["geo_anonymous"]"#,
    ]).unwrap();
    wtr.flush().unwrap();

    let fraud = dir.join("fraud_list.csv");
    std::fs::write(&fraud, "customer_email,ip\na@example.com,\n,2.2.2.2\n").unwrap();
    (data, fraud)
}

fn config(dir: &TempDir) -> RunConfig {
    let (data, fraud) = write_inputs(dir.path());
    let mut config = RunConfig::new(data);
    config.fraud_list = fraud;
    config.output = dir.path().join("out").join("scores.csv");
    config
}

fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers = rdr.headers().unwrap().iter().map(String::from).collect();
    let rows = rdr
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn num(cell: &str) -> f64 {
    cell.parse().unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-6, "expected {expected}, got {actual}");
}

#[tokio::test]
async fn scores_every_row_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    let config = config(&dir);

    let summary = run(&config).await.unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.accounts, 2);
    assert_eq!(summary.flagged, 3);
    assert_eq!(summary.signalled, 1);

    let (headers, rows) = read_output(&config.output);
    assert_eq!(headers, vec![
        "sessionid", "accountid", "endpointscore", "purchasescore", "shippingscore",
        "finalscore", "finalband", "fraudlistentry", "signalstriggered",
    ]);
    let sessions: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(sessions, vec!["s3", "s1", "s2"]);

    // s3: second transaction of b, every scorer discounted for short history
    let s3 = &rows[0];
    let endpoint = 65.625;
    let purchase = 100.0 * (2.0 + 1.5) / 4.5 * 0.75;
    let shipping = 75.0;
    assert_close(num(&s3[2]), endpoint);
    assert_close(num(&s3[3]), purchase);
    assert_close(num(&s3[4]), shipping);
    let fused = 0.25 * endpoint + 0.5 * shipping + 0.25 * purchase;
    assert_close(num(&s3[5]), fused);
    assert_close(num(&s3[6]), 1.0 + 4.0 * (1.0 - fused / 100.0));
    assert_eq!(s3[7], "false");
    assert_eq!(s3[8], "");

    // s1: single-transaction account on the fraud list
    let s1 = &rows[1];
    assert_close(num(&s1[5]), 100.0);
    assert_close(num(&s1[6]), 1.0);
    assert_eq!(s1[7], "true");

    // s2: first transaction of b with geo_anonymous alone
    let s2 = &rows[2];
    assert_close(num(&s2[5]), 60.0);
    assert_close(num(&s2[6]), 2.6);
    assert_eq!(s2[8], "geo_anonymous");
}

#[tokio::test]
async fn disabled_scorer_leaves_column_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    let mut config = config(&dir);
    config.purchase = false;

    run(&config).await.unwrap();
    let (_, rows) = read_output(&config.output);
    let s3 = &rows[0];
    assert_eq!(s3[3], "");
    assert_close(num(&s3[5]), (0.25 * 65.625 + 0.5 * 75.0) / 0.75);
}

#[tokio::test]
async fn missing_fraud_list_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    config.fraud_list = dir.path().join("absent.csv");
    config.output = dir.path().join("scores.csv");

    assert!(run(&config).await.is_err());
    assert!(!config.output.exists());
}

#[tokio::test]
async fn unscoreable_window_fails_batch() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("bare.csv");
    std::fs::write(&data, "sessionid,accountid,unixtime\ns0,a,1\ns1,a,2\n").unwrap();
    let fraud = dir.path().join("fraud.csv");
    std::fs::write(&fraud, "customer_email,ip\n").unwrap();

    let mut config = RunConfig::new(&data);
    config.fraud_list = fraud;
    config.output = dir.path().join("scores.csv");
    config.shipping = false;
    config.purchase = false;

    let err = run(&config).await.unwrap_err();
    assert!(format!("{err:#}").contains("no eligible feature"), "{err:#}");
    assert!(!config.output.exists());
}

#[tokio::test]
async fn semicolon_delimited_input() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("tx.csv");
    std::fs::write(&data, "sessionid;accountid;unixtime;country\ns0;a;1;US\ns1;a;2;US\ns2;a;3;US\n").unwrap();
    let fraud = dir.path().join("fraud.csv");
    std::fs::write(&fraud, "customer_email,ip\n").unwrap();

    let mut config = RunConfig::new(&data);
    config.fraud_list = fraud;
    config.output = dir.path().join("scores.csv");
    config.delimiter = ';';
    config.endpoint = false;
    config.purchase = false;

    let summary = run(&config).await.unwrap();
    assert_eq!(summary.rows, 3);
    let (_, rows) = read_output(&config.output);
    // identical empty shipping payloads: full match from the third row on
    assert_close(num(&rows[2][4]), 100.0);
    assert_close(num(&rows[1][4]), 75.0);
}

#[tokio::test]
async fn empty_table_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("empty.csv");
    std::fs::write(&data, "sessionid,accountid,unixtime,ip\n").unwrap();
    let fraud = dir.path().join("fraud.csv");
    std::fs::write(&fraud, "customer_email,ip\n").unwrap();

    let mut config = RunConfig::new(&data);
    config.fraud_list = fraud;
    config.output = dir.path().join("scores.csv");

    let summary = run(&config).await.unwrap();
    assert_eq!(summary.rows, 0);
    let (headers, rows) = read_output(&config.output);
    assert_eq!(headers.len(), 9);
    assert_eq!(headers[0], "sessionid");
    assert!(rows.is_empty());
}
