use super::*;

#[test]
fn parses_ask_with_location_and_history() {
    let cli = Cli::try_parse_from([
        "geoscout",
        "ask",
        "what about by bike?",
        "--at",
        "51.5074,-0.1278",
        "--previous",
        "cafes within 10 minutes",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::Ask {
            query,
            at,
            user,
            previous,
            memory,
            ..
        } => {
            assert_eq!(query, "what about by bike?");
            let at = at.unwrap();
            assert!((at.lat() - 51.5074).abs() < 1e-9);
            assert_eq!(user, "cli");
            assert_eq!(previous, vec!["cafes within 10 minutes".to_owned()]);
            assert!(!memory);
        }
        other => panic!("expected ask, got {other:?}"),
    }
}

#[test]
fn ask_collects_repeated_preferences() {
    let cli = Cli::try_parse_from([
        "geoscout",
        "ask",
        "parks",
        "--memory",
        "--prefer-transport",
        "bike",
        "--prefer-poi",
        "park",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Commands::Ask {
            memory: true,
            ref prefer_transport,
            ref prefer_poi,
            ..
        } if prefer_transport == &vec![TransportMode::Cycling]
            && prefer_poi == &vec![PoiType::Park]
    ));
}

#[test]
fn rejects_malformed_coordinates() {
    let result = Cli::try_parse_from([
        "geoscout",
        "nearest",
        "--at",
        "north-ish",
        "--type",
        "pharmacy",
    ]);
    assert!(result.is_err());
}

#[test]
fn within_time_defaults() {
    let cli = Cli::try_parse_from([
        "geoscout",
        "within-time",
        "--at",
        "51.5,-0.1",
        "--type",
        "cafe",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Commands::WithinTime {
            poi_type: PoiType::Cafe,
            minutes: 15,
            transport: TransportMode::Walking,
            cuisine: None,
            ..
        }
    ));
}

#[test]
fn near_poi_takes_an_anchor_type() {
    let cli = Cli::try_parse_from([
        "geoscout",
        "near-poi",
        "--at",
        "51.5,-0.1",
        "--type",
        "cafe",
        "--near",
        "park",
        "--minutes",
        "5",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Commands::NearPoi {
            poi_type: PoiType::Cafe,
            near: PoiType::Park,
            minutes: 5,
            ..
        }
    ));
}

#[test]
fn enroute_destination_may_be_coordinates_or_text() {
    let by_name = Cli::try_parse_from([
        "geoscout", "enroute", "--at", "51.5,-0.1", "--to", "Brighton", "--type", "gas_station",
    ])
    .unwrap();
    assert!(matches!(
        by_name.command,
        Commands::Enroute {
            to: PlaceRef::Text(ref name),
            transport: TransportMode::Driving,
            max_total: 180,
            max_detour: 10,
            ..
        } if name == "Brighton"
    ));

    let by_coordinates = Cli::try_parse_from([
        "geoscout", "enroute", "--at", "51.5,-0.1", "--to", "50.82,-0.14", "--type", "gas_station",
    ])
    .unwrap();
    assert!(matches!(
        by_coordinates.command,
        Commands::Enroute {
            to: PlaceRef::Coordinates(_),
            ..
        }
    ));
}

#[test]
fn out_of_range_coordinates_are_treated_as_place_names() {
    assert_eq!(
        parse_place("95.0,10.0").unwrap(),
        PlaceRef::Text("95.0,10.0".to_owned())
    );
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["geoscout"]).is_err());
}
