//! Captured `pfctl -s info` outputs used as test fixtures.
//!
//! Values are chosen to be distinct so that a counter read from the wrong
//! column or line is easy to spot.

/// Output without `set loginterface`: no `Interface Stats` section.
pub const PFCTL_INFO: &str = "\
Status: Enabled for 0 days 00:26:05           Debug: Urgent

State Table                          Total             Rate
  current entries                        2               
  searches                           11325            7.2/s
  inserts                               28            0.0/s
  removals                              26            0.0/s
Counters
  match                              11325            7.2/s
  bad-offset                             0            0.0/s
  fragment                               1            0.0/s
  short                                  2            0.0/s
  normalize                              3            0.0/s
  memory                                 4            0.0/s
  bad-timestamp                          5            0.0/s
  congestion                             6            0.0/s
  ip-option                              7            0.0/s
  proto-cksum                            8            0.0/s
  state-mismatch                         9            0.0/s
  state-insert                          10            0.0/s
  state-limit                           11            0.0/s
  src-limit                             12            0.0/s
  synproxy                              13            0.0/s
";

/// Output with `set loginterface em0`.
pub const PFCTL_INFO_FULL: &str = "\
Status: Enabled for 0 days 00:26:05           Debug: Urgent

Interface Stats for em0               IPv4             IPv6
  Bytes In                         1234567             2048
  Bytes Out                         891011             1024
  Packets In
    Passed                           12345               32
    Blocked                             67                4
  Packets Out
    Passed                            9876               16
    Blocked                              5                1

State Table                          Total             Rate
  current entries                        2               
  searches                           11325            7.2/s
  inserts                               28            0.0/s
  removals                              26            0.0/s
Counters
  match                              11325            7.2/s
  bad-offset                             0            0.0/s
  fragment                               1            0.0/s
  short                                  2            0.0/s
  normalize                              3            0.0/s
  memory                                 4            0.0/s
  bad-timestamp                          5            0.0/s
  congestion                             6            0.0/s
  ip-option                              7            0.0/s
  proto-cksum                            8            0.0/s
  state-mismatch                         9            0.0/s
  state-insert                          10            0.0/s
  state-limit                           11            0.0/s
  src-limit                             12            0.0/s
  synproxy                              13            0.0/s
";

/// Output of a pfctl build that prints `Status` only (pf disabled).
pub const PFCTL_DISABLED: &str = "\
Status: Disabled                              Debug: Urgent
";
