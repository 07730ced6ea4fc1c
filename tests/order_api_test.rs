// ==========================================
// 订单 API 集成测试
// ==========================================
// 测试目标: 发货流转契约（幂等/拒绝/未找到）+ 审计日志
// ==========================================


use order_flow::api::ApiError;
use order_flow::app::AppState;
use order_flow::domain::types::OrderStatus;
use order_flow::logging;

/// 创建测试 AppState 并准备场景订单
///
/// - 订单 1: Processing
/// - 订单 2: Shipped
/// - 订单 3: Pending
/// - 订单 4: Cancelled
/// - 订单 999: 不存在
fn setup() -> (tempfile::NamedTempFile, AppState) {
    logging::init_test();

    let (temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");

    let conn = test_helpers::open_test_connection(&db_path).expect("Failed to open db");
    test_helpers::insert_test_config(&conn).expect("Failed to insert config");
    test_helpers::seed_order(&conn, 1, "Processing").expect("Failed to seed order");
    test_helpers::seed_order(&conn, 2, "Shipped").expect("Failed to seed order");
    test_helpers::seed_order(&conn, 3, "Pending").expect("Failed to seed order");
    test_helpers::seed_order(&conn, 4, "Cancelled").expect("Failed to seed order");
    drop(conn);

    let app_state = AppState::new(db_path).expect("Failed to create AppState");
    (temp_file, app_state)
}

#[test]
fn test_processing_to_shipped() {
    let (_temp_file, app) = setup();

    let outcome = app
        .order_api
        .transition_to_shipped(1, "tester")
        .expect("Transition should succeed");

    assert_eq!(outcome.old_status, OrderStatus::Processing);
    assert_eq!(outcome.new_status, OrderStatus::Shipped);
    assert!(outcome.changed);

    // 落库验证
    let order = app.order_api.get_order(1).expect("Order should exist");
    assert_eq!(order.status, OrderStatus::Shipped);

    // 审计日志验证
    let logs = app
        .order_api
        .list_transition_logs(1, 10)
        .expect("Query should succeed");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action_type, "SHIP");
    assert_eq!(logs[0].from_status.as_deref(), Some("Processing"));
    assert_eq!(logs[0].to_status.as_deref(), Some("Shipped"));
    assert_eq!(logs[0].actor, "tester");
}

#[test]
fn test_already_shipped_is_noop() {
    let (_temp_file, app) = setup();

    let outcome = app
        .order_api
        .transition_to_shipped(2, "tester")
        .expect("Transition should succeed");

    assert_eq!(outcome.old_status, OrderStatus::Shipped);
    assert_eq!(outcome.new_status, OrderStatus::Shipped);
    assert!(!outcome.changed);

    // 状态未变
    let order = app.order_api.get_order(2).expect("Order should exist");
    assert_eq!(order.status, OrderStatus::Shipped);

    // 幂等跳过不写审计日志
    let logs = app
        .order_api
        .list_transition_logs(2, 10)
        .expect("Query should succeed");
    assert!(logs.is_empty());
}

#[test]
fn test_pending_to_shipped() {
    let (_temp_file, app) = setup();

    let outcome = app
        .order_api
        .transition_to_shipped(3, "tester")
        .expect("Transition should succeed");

    assert_eq!(outcome.old_status, OrderStatus::Pending);
    assert_eq!(outcome.new_status, OrderStatus::Shipped);
    assert!(outcome.changed);

    let order = app.order_api.get_order(3).expect("Order should exist");
    assert_eq!(order.status, OrderStatus::Shipped);
}

#[test]
fn test_absent_order_is_not_found() {
    let (_temp_file, app) = setup();

    let result = app.order_api.transition_to_shipped(999, "tester");
    match result {
        Err(ApiError::NotFound(msg)) => {
            assert!(msg.contains("999"));
        }
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_cancelled_order_is_rejected() {
    let (_temp_file, app) = setup();

    let result = app.order_api.transition_to_shipped(4, "tester");
    match result {
        Err(ApiError::InvalidStateTransition { from, to }) => {
            assert_eq!(from, "Cancelled");
            assert_eq!(to, "Shipped");
        }
        other => panic!("Expected InvalidStateTransition, got {:?}", other),
    }

    // 拒绝不得改写存储
    let order = app.order_api.get_order(4).expect("Order should exist");
    assert_eq!(order.status, OrderStatus::Cancelled);

    // 拒绝不写审计日志
    let logs = app
        .order_api
        .list_transition_logs(4, 10)
        .expect("Query should succeed");
    assert!(logs.is_empty());
}

#[test]
fn test_repeated_transition_is_idempotent() {
    let (_temp_file, app) = setup();

    let first = app
        .order_api
        .transition_to_shipped(1, "tester")
        .expect("Transition should succeed");
    assert!(first.changed);

    let second = app
        .order_api
        .transition_to_shipped(1, "tester")
        .expect("Transition should succeed");
    assert_eq!(second.old_status, OrderStatus::Shipped);
    assert_eq!(second.new_status, OrderStatus::Shipped);
    assert!(!second.changed);

    // 只有首次改写产生审计日志
    let logs = app
        .order_api
        .list_transition_logs(1, 10)
        .expect("Query should succeed");
    assert_eq!(logs.len(), 1);
}

#[test]
fn test_input_validation() {
    let (_temp_file, app) = setup();

    let result = app.order_api.transition_to_shipped(0, "tester");
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    let result = app.order_api.transition_to_shipped(-5, "tester");
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    let result = app.order_api.transition_to_shipped(1, "  ");
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    let result = app.order_api.get_order(0);
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
}

#[test]
fn test_list_orders_and_summary() {
    let (_temp_file, app) = setup();

    // 全量查询
    let all = app
        .order_api
        .list_orders(None, 0, 0)
        .expect("Query should succeed");
    assert_eq!(all.len(), 4);

    // 按状态过滤
    let pending = app
        .order_api
        .list_orders(Some(OrderStatus::Pending), 10, 0)
        .expect("Query should succeed");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].order_id, 3);

    // 状态汇总
    let summary = app
        .order_api
        .get_status_summary()
        .expect("Query should succeed");
    let total: i64 = summary.iter().map(|s| s.count).sum();
    assert_eq!(total, 4);
    assert!(summary.iter().any(|s| s.status == "Shipped" && s.count == 1));

    // 流转后汇总变化
    app.order_api
        .transition_to_shipped(1, "tester")
        .expect("Transition should succeed");
    let summary = app
        .order_api
        .get_status_summary()
        .expect("Query should succeed");
    assert!(summary.iter().any(|s| s.status == "Shipped" && s.count == 2));
}

#[test]
fn test_purge_expired_logs() {
    let (_temp_file, app) = setup();

    // 新日志不在清理范围内
    app.order_api
        .transition_to_shipped(1, "tester")
        .expect("Transition should succeed");
    let purged = app
        .order_api
        .purge_expired_logs()
        .expect("Purge should succeed");
    assert_eq!(purged, 0);

    // 构造一条远超保留期的旧日志
    let conn = test_helpers::open_test_connection(app.get_db_path()).expect("Failed to open db");
    conn.execute(
        r#"
        INSERT INTO transition_log (
            log_id, order_id, action_type, from_status, to_status,
            action_ts, actor, payload_json, detail
        ) VALUES ('L-old', 3, 'SHIP', 'Pending', 'Shipped',
                  datetime('now', '-400 days'), 'tester', NULL, NULL)
        "#,
        [],
    )
    .expect("Insert should succeed");
    drop(conn);

    let purged = app
        .order_api
        .purge_expired_logs()
        .expect("Purge should succeed");
    assert_eq!(purged, 1);
}
